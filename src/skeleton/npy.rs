//! Minimal reader for NumPy `.npy` keypoint arrays.
//!
//! Supports the subset the pose extraction pass produces: format versions
//! 1.0 and 2.0, little-endian `f4`/`f8` payloads, C order, and a
//! `frames x keypoints x 3` shape. Anything else is rejected.

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::Array3;
use thiserror::Error;

const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Errors raised while decoding an `.npy` file.
#[derive(Debug, Error)]
pub enum NpyError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{path} is not an npy file")]
    BadMagic { path: PathBuf },
    #[error("Unsupported npy version {major}.{minor} in {path}")]
    Version { path: PathBuf, major: u8, minor: u8 },
    #[error("Malformed npy header in {path}")]
    Header { path: PathBuf },
    #[error("Unsupported dtype '{descr}' in {path} (expected <f4 or <f8)")]
    Dtype { path: PathBuf, descr: String },
    #[error("Fortran-ordered arrays are not supported: {path}")]
    FortranOrder { path: PathBuf },
    #[error("{path}: expected a frames x keypoints x 3 array, found shape {shape:?}")]
    Shape { path: PathBuf, shape: Vec<usize> },
    #[error("{path}: payload holds {found} bytes but the shape needs {needed}")]
    Payload {
        path: PathBuf,
        found: usize,
        needed: usize,
    },
}

/// Load one keypoint stream from disk.
pub fn load_array(path: &Path) -> Result<Array3<f32>, NpyError> {
    let bytes = fs::read(path).map_err(|source| NpyError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    decode(&bytes, path)
}

fn decode(bytes: &[u8], path: &Path) -> Result<Array3<f32>, NpyError> {
    let at = |variant: fn(PathBuf) -> NpyError| variant(path.to_path_buf());

    if bytes.len() < 10 || &bytes[..6] != MAGIC {
        return Err(at(|path| NpyError::BadMagic { path }));
    }
    let (major, minor) = (bytes[6], bytes[7]);
    let (header_len, header_start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10usize),
        2 => {
            if bytes.len() < 12 {
                return Err(at(|path| NpyError::Header { path }));
            }
            let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
            (len, 12usize)
        }
        _ => {
            return Err(NpyError::Version {
                path: path.to_path_buf(),
                major,
                minor,
            });
        }
    };
    let header_end = header_start
        .checked_add(header_len)
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| at(|path| NpyError::Header { path }))?;
    let header = std::str::from_utf8(&bytes[header_start..header_end])
        .map_err(|_| at(|path| NpyError::Header { path }))?;

    let descr =
        dict_str_value(header, "descr").ok_or_else(|| at(|path| NpyError::Header { path }))?;
    let item_size = match descr {
        "<f4" => 4,
        "<f8" => 8,
        other => {
            return Err(NpyError::Dtype {
                path: path.to_path_buf(),
                descr: other.to_string(),
            });
        }
    };
    let fortran = dict_bool_value(header, "fortran_order")
        .ok_or_else(|| at(|path| NpyError::Header { path }))?;
    if fortran {
        return Err(at(|path| NpyError::FortranOrder { path }));
    }
    let shape = dict_shape(header).ok_or_else(|| at(|path| NpyError::Header { path }))?;
    if shape.len() != 3 || shape[2] != 3 {
        return Err(NpyError::Shape {
            path: path.to_path_buf(),
            shape,
        });
    }

    let elements: usize = shape.iter().product();
    let payload = &bytes[header_end..];
    let needed = elements * item_size;
    if payload.len() < needed {
        return Err(NpyError::Payload {
            path: path.to_path_buf(),
            found: payload.len(),
            needed,
        });
    }

    let mut data = Vec::with_capacity(elements);
    if item_size == 4 {
        for chunk in payload[..needed].chunks_exact(4) {
            data.push(f32::from_le_bytes(chunk.try_into().expect("chunk size verified")));
        }
    } else {
        for chunk in payload[..needed].chunks_exact(8) {
            data.push(f64::from_le_bytes(chunk.try_into().expect("chunk size verified")) as f32);
        }
    }

    Array3::from_shape_vec((shape[0], shape[1], shape[2]), data).map_err(|_| NpyError::Shape {
        path: path.to_path_buf(),
        shape,
    })
}

/// Extract a quoted string value from the header dict.
fn dict_str_value<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let rest = after_key(header, key)?;
    let rest = rest.strip_prefix('\'')?;
    let end = rest.find('\'')?;
    Some(&rest[..end])
}

/// Extract a `True`/`False` value from the header dict.
fn dict_bool_value(header: &str, key: &str) -> Option<bool> {
    let rest = after_key(header, key)?;
    if rest.starts_with("True") {
        Some(true)
    } else if rest.starts_with("False") {
        Some(false)
    } else {
        None
    }
}

/// Extract the shape tuple from the header dict.
fn dict_shape(header: &str) -> Option<Vec<usize>> {
    let rest = after_key(header, "shape")?;
    let rest = rest.strip_prefix('(')?;
    let end = rest.find(')')?;
    rest[..end]
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(|field| field.parse().ok())
        .collect()
}

/// Position the cursor just past `'key':`, with whitespace consumed.
fn after_key<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let quoted = format!("'{key}'");
    let idx = header.find(&quoted)?;
    let rest = &header[idx + quoted.len()..];
    let rest = rest.trim_start();
    let rest = rest.strip_prefix(':')?;
    Some(rest.trim_start())
}

#[cfg(test)]
pub(crate) fn encode_for_tests(descr: &str, shape: &[usize], values: &[f64]) -> Vec<u8> {
    let shape_str = if shape.len() == 1 {
        format!("({},)", shape[0])
    } else {
        let fields: Vec<String> = shape.iter().map(|dim| dim.to_string()).collect();
        format!("({})", fields.join(", "))
    };
    let mut header = format!("{{'descr': '{descr}', 'fortran_order': False, 'shape': {shape_str}, }}");
    while (10 + header.len() + 1) % 64 != 0 {
        header.push(' ');
    }
    header.push('\n');

    let mut bytes = Vec::new();
    bytes.extend_from_slice(MAGIC);
    bytes.push(1);
    bytes.push(0);
    bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    for value in values {
        match descr {
            "<f4" => bytes.extend_from_slice(&(*value as f32).to_le_bytes()),
            "<f8" => bytes.extend_from_slice(&value.to_le_bytes()),
            other => panic!("unsupported test descr {other}"),
        }
    }
    bytes
}
