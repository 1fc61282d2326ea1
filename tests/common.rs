#![allow(unused)]
use std::sync::Once;

use sdpagent::{Attribute, MediaBlock, MediaType, SessionMessage};

pub fn init_log() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    static START: Once = Once::new();

    START.call_once(|| {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(env_filter)
            .init();
    });
}

/// Attribute from `key` or `key:value`.
pub fn attr(line: &str) -> Attribute {
    match line.split_once(':') {
        Some((k, v)) => Attribute::new(k, v),
        None => Attribute::flag(line),
    }
}

pub fn media(typ: MediaType, proto: &str, formats: &[&str], attrs: &[&str]) -> MediaBlock {
    let mut m = MediaBlock::new(typ, proto);
    m.formats = formats.iter().map(|f| f.to_string()).collect();
    m.attrs = attrs.iter().map(|a| attr(a)).collect();
    m
}

pub fn message(attrs: &[&str], medias: Vec<MediaBlock>) -> SessionMessage {
    SessionMessage {
        attrs: attrs.iter().map(|a| attr(a)).collect(),
        medias,
    }
}

/// The attributes as `a=` lines.
pub fn lines(attrs: &[Attribute]) -> Vec<String> {
    attrs.iter().map(|a| a.to_string()).collect()
}
