//! `data-uri(url)` / `data-uri(mime, url)` — inlines a file found via the
//! configured import directories as a base64 `data:` URI when it resolves
//! and is small enough; otherwise falls back to a plain `url(...)`.

use std::path::Path;

use crate::error::{EvalError, EvalResult};
use crate::value::Value;

const MAX_EMBED_BYTES: usize = 32 * 1024;

const BASE64_ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn base64_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity((data.len() + 2) / 3 * 4);
    for chunk in data.chunks(3) {
        let b0 = chunk[0];
        let b1 = *chunk.get(1).unwrap_or(&0);
        let b2 = *chunk.get(2).unwrap_or(&0);
        let n = (u32::from(b0) << 16) | (u32::from(b1) << 8) | u32::from(b2);
        out.push(BASE64_ALPHABET[(n >> 18 & 0x3f) as usize] as char);
        out.push(BASE64_ALPHABET[(n >> 12 & 0x3f) as usize] as char);
        out.push(if chunk.len() > 1 { BASE64_ALPHABET[(n >> 6 & 0x3f) as usize] as char } else { '=' });
        out.push(if chunk.len() > 2 { BASE64_ALPHABET[(n & 0x3f) as usize] as char } else { '=' });
    }
    out
}

fn guess_mime(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase().as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "eot" => "application/vnd.ms-fontobject",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

pub fn data_uri(args: &[Value], import_dirs: &[std::path::PathBuf]) -> EvalResult<Value> {
    if args.is_empty() {
        return Err(EvalError::argument_mismatch("data-uri: missing url argument"));
    }
    let (mime_arg, url_arg) = if args.len() >= 2 { (Some(&args[0]), &args[1]) } else { (None, &args[0]) };
    let url = url_arg.stringify();

    let found = import_dirs.iter().map(|dir| dir.join(&url)).find(|p| p.is_file());

    let Some(path) = found else {
        return Ok(Value::string(Some('"'), format!("url({url})")));
    };

    let Ok(bytes) = std::fs::read(&path) else {
        return Ok(Value::string(Some('"'), format!("url({url})")));
    };

    if bytes.len() > MAX_EMBED_BYTES {
        return Ok(Value::string(Some('"'), format!("url({url})")));
    }

    let mime = mime_arg.map(Value::stringify).unwrap_or_else(|| guess_mime(&path).to_string());
    let encoded = base64_encode(&bytes);
    Ok(Value::string(Some('"'), format!("data:{mime};base64,{encoded}")))
}
