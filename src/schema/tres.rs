//! GPU counts from TRES strings such as `cpu=64,mem=500G,node=1,gres/gpu=4`.

use crate::error::ParseError;

const GPU_KEY: &str = "gres/gpu";

/// Returns the `gres/gpu` count in a TRES string, or 0 when the node has none.
///
/// Only the exact key counts; typed entries like `gres/gpu:a100=2` are
/// ignored. A `gres/gpu` entry whose value is not an integer is an error.
pub fn gpu_count(tres: &str) -> Result<u64, ParseError> {
    for token in tres.split(',') {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        if key.trim() != GPU_KEY {
            continue;
        }
        return value
            .trim()
            .parse::<u64>()
            .map_err(|_| ParseError::InvalidTres(tres.to_string()));
    }
    Ok(0)
}
