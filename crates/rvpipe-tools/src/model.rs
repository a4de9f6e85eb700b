use anyhow::Result;
use std::path::Path;

use rvpipe::DATA_BASE;

#[derive(Debug, Clone)]
pub struct Segment {
    pub name: String,
    pub base: u32,
    pub bytes: Vec<u8>,
    pub perms: &'static str, // e.g., "r-x"
    pub kind: &'static str,  // "text" or "data"
}

#[derive(Debug, Clone)]
pub struct Image {
    pub segments: Vec<Segment>,
}

/// Groups address-sorted bytes into contiguous segments.
fn runs(bytes: &[(u32, u8)], prefix: &str, perms: &'static str, kind: &'static str) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::new();
    for &(addr, b) in bytes {
        match out.last_mut() {
            Some(s) if s.base.wrapping_add(s.bytes.len() as u32) == addr => s.bytes.push(b),
            _ => out.push(Segment {
                name: format!("{prefix}{}", out.len()),
                base: addr,
                bytes: vec![b],
                perms,
                kind,
            }),
        }
    }
    out
}

/// Builds an image from an assembled machine-code listing.
pub fn from_listing(source: &str) -> Result<Image> {
    let loaded = rvpipe::Image::parse(source)?;

    let mut text: Vec<(u32, u8)> = loaded
        .text
        .iter()
        .flat_map(|&(addr, word)| {
            word.to_be_bytes()
                .into_iter()
                .enumerate()
                .map(move |(i, b)| (addr.wrapping_add(i as u32), b))
        })
        .collect();
    text.sort_by_key(|(a, _)| *a);
    let mut data = loaded.data.clone();
    data.sort_by_key(|(a, _)| *a);
    anyhow::ensure!(
        data.iter().all(|(a, _)| *a >= DATA_BASE),
        "data byte below {DATA_BASE:#x}"
    );

    let mut segments = runs(&text, ".text", "r-x", "text");
    segments.extend(runs(&data, ".data", "rw-", "data"));
    Ok(Image { segments })
}

pub fn load_listing(path: &Path) -> Result<Image> {
    let source = std::fs::read_to_string(path)?;
    from_listing(&source)
}

pub fn read_u8(img: &Image, addr: u32) -> Option<u8> {
    for s in &img.segments {
        let start = s.base;
        let end = s.base.wrapping_add(s.bytes.len() as u32);
        if addr >= start && addr < end {
            let off = (addr - start) as usize;
            return Some(s.bytes[off]);
        }
    }
    None
}

/// Big-endian word.
pub fn read_u32(img: &Image, addr: u32) -> Option<u32> {
    let b0 = read_u8(img, addr)?;
    let b1 = read_u8(img, addr.wrapping_add(1))?;
    let b2 = read_u8(img, addr.wrapping_add(2))?;
    let b3 = read_u8(img, addr.wrapping_add(3))?;
    Some(u32::from_be_bytes([b0, b1, b2, b3]))
}

pub fn is_mapped(img: &Image, addr: u32) -> bool {
    read_u8(img, addr).is_some()
}
