use super::value::{CborMap, CborMapKey, CborValue};

/// Encodes a value using definite lengths, the shortest argument encoding and
/// canonical map key ordering.
pub fn encode(value: &CborValue) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

pub(super) fn encode_key(key: &CborMapKey) -> Vec<u8> {
    let mut out = Vec::new();
    match key {
        CborMapKey::Int(n) => encode_into(&CborValue::integer(*n), &mut out),
        CborMapKey::Text(s) => write_text(s, &mut out),
    }
    out
}

fn encode_into(value: &CborValue, out: &mut Vec<u8>) {
    match value {
        CborValue::Unsigned(n) => write_header(out, 0, *n),
        CborValue::Negative(n) => write_header(out, 1, *n),
        CborValue::Bytes(bytes) => {
            write_header(out, 2, bytes.len() as u64);
            out.extend_from_slice(bytes.as_slice());
        }
        CborValue::Text(text) => write_text(text, out),
        CborValue::Array(items) => {
            write_header(out, 4, items.len() as u64);
            for item in items {
                encode_into(item, out);
            }
        }
        CborValue::Map(map) => write_map(map, out),
        CborValue::Bool(false) => out.push(0xf4),
        CborValue::Bool(true) => out.push(0xf5),
        CborValue::Null => out.push(0xf6),
        CborValue::Simple(n) if *n < 24 => out.push(0xe0 | n),
        CborValue::Simple(n) => out.extend_from_slice(&[0xf8, *n]),
        CborValue::Float(f) => {
            out.push(0xfb);
            out.extend_from_slice(&f.to_be_bytes());
        }
    }
}

fn write_text(text: &str, out: &mut Vec<u8>) {
    write_header(out, 3, text.len() as u64);
    out.extend_from_slice(text.as_bytes());
}

fn write_map(map: &CborMap, out: &mut Vec<u8>) {
    let mut entries: Vec<(Vec<u8>, &CborValue)> =
        map.iter().map(|(k, v)| (encode_key(k), v)).collect();
    entries.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

    write_header(out, 5, entries.len() as u64);
    for (key, value) in entries {
        out.extend_from_slice(&key);
        encode_into(value, out);
    }
}

fn write_header(out: &mut Vec<u8>, major: u8, argument: u64) {
    let major = major << 5;
    match argument {
        0..=23 => out.push(major | argument as u8),
        24..=0xff => out.extend_from_slice(&[major | 24, argument as u8]),
        0x100..=0xffff => {
            out.push(major | 25);
            out.extend_from_slice(&(argument as u16).to_be_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(major | 26);
            out.extend_from_slice(&(argument as u32).to_be_bytes());
        }
        _ => {
            out.push(major | 27);
            out.extend_from_slice(&argument.to_be_bytes());
        }
    }
}
