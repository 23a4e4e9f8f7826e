#![allow(dead_code)]

use std::io::{Cursor, Write};

use flate2::write::GzEncoder;
use flate2::Compression;

/// A gzipped tar archive holding the given (path, contents) members.
pub fn tar_gz_bytes(members: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, contents) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, contents.as_bytes())
            .expect("append member");
    }
    builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .expect("finish archive")
}

/// A zip archive holding the given (path, contents) members.
pub fn zip_bytes(members: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default();
    for (name, contents) in members {
        writer.start_file(*name, options).expect("start member");
        writer.write_all(contents.as_bytes()).expect("write member");
    }
    writer.finish().expect("finish archive").into_inner()
}

pub fn have_tool(name: &str) -> bool {
    which::which(name).is_ok()
}
