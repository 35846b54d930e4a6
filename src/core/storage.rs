//! Persistence of trained controllers.
//!
//! Two formats:
//! - JSON (`SavedController`), human-editable, behind the `serde` feature.
//! - A compact little-endian binary genome:
//!
//! ```text
//! MAGIC "TIGRCPG1" | u32 version | u32 mode tag | u32 count | count x f64
//! ```

use std::io::{self, Read, Write};

#[cfg(feature = "serde")]
use std::{fs, path::Path};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::CpgConfig;
use crate::decoder::{build_oscillator_network, decode_with_mode, DecoderMode};
use crate::error::Result;
use crate::oscillator::{CpgParams, OscillatorNetwork};

pub const MAGIC: &[u8; 8] = b"TIGRCPG1";
pub const VERSION_V1: u32 = 1;
pub const VERSION_CURRENT: u32 = VERSION_V1;

/// Upper bound on the stored value count; genomes are tiny.
const MAX_VALUES: usize = 1 << 16;

pub fn write_u32_le<W: Write>(w: &mut W, v: u32) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

pub fn write_f64_le<W: Write>(w: &mut W, v: f64) -> io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

pub fn read_exact<const N: usize, R: Read>(r: &mut R) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn read_u32_le<R: Read>(r: &mut R) -> io::Result<u32> {
    Ok(u32::from_le_bytes(read_exact::<4, _>(r)?))
}

pub fn read_f64_le<R: Read>(r: &mut R) -> io::Result<f64> {
    Ok(f64::from_le_bytes(read_exact::<8, _>(r)?))
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

/// Write a genome in the binary format.
pub fn write_genome<W: Write>(w: &mut W, mode: DecoderMode, genome: &[f64]) -> Result<()> {
    if genome.len() != mode.genome_len() {
        return Err(invalid(format!(
            "{mode:?} genome needs {} values, got {}",
            mode.genome_len(),
            genome.len()
        ))
        .into());
    }
    w.write_all(MAGIC)?;
    write_u32_le(w, VERSION_CURRENT)?;
    write_u32_le(w, mode.tag())?;
    write_u32_le(w, genome.len() as u32)?;
    for &v in genome {
        write_f64_le(w, v)?;
    }
    Ok(())
}

/// Read a genome written by `write_genome`.
pub fn read_genome<R: Read>(r: &mut R) -> Result<(DecoderMode, Vec<f64>)> {
    let magic = read_exact::<8, _>(r)?;
    if &magic != MAGIC {
        return Err(invalid("bad magic".to_string()).into());
    }
    let version = read_u32_le(r)?;
    if version != VERSION_CURRENT {
        return Err(invalid(format!("unsupported version {version}")).into());
    }
    let tag = read_u32_le(r)?;
    let mode = DecoderMode::from_tag(tag).ok_or_else(|| invalid(format!("unknown mode tag {tag}")))?;
    let count = read_u32_le(r)? as usize;
    if count != mode.genome_len() || count > MAX_VALUES {
        return Err(invalid(format!(
            "{mode:?} genome needs {} values, header says {count}",
            mode.genome_len()
        ))
        .into());
    }
    let mut genome = Vec::with_capacity(count);
    for _ in 0..count {
        genome.push(read_f64_le(r)?);
    }
    Ok((mode, genome))
}

/// A trained controller as stored on disk.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SavedController {
    pub mode: DecoderMode,
    /// Genome in physical units.
    pub params: Vec<f64>,
    /// Integration step the controller was trained with.
    pub dt: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub remarks: String,
}

impl SavedController {
    pub fn new(mode: DecoderMode, params: Vec<f64>, dt: f64) -> Self {
        Self {
            mode,
            params,
            dt,
            remarks: String::new(),
        }
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = remarks.into();
        self
    }

    pub fn decode(&self) -> Result<CpgParams> {
        decode_with_mode(self.mode, &self.params)
    }

    /// Fresh network using `cfg` with the stored `dt`.
    pub fn build_network(&self, cfg: CpgConfig) -> Result<OscillatorNetwork> {
        if self.params.len() != self.mode.genome_len() {
            return Err(invalid(format!(
                "{:?} genome needs {} values, got {}",
                self.mode,
                self.mode.genome_len(),
                self.params.len()
            ))
            .into());
        }
        build_oscillator_network(&self.params, cfg.with_dt(self.dt))
    }

    pub fn write_binary<W: Write>(&self, w: &mut W) -> Result<()> {
        write_genome(w, self.mode, &self.params)
    }

    /// Read a binary genome; `dt` is not part of the binary format.
    pub fn read_binary<R: Read>(r: &mut R, dt: f64) -> Result<Self> {
        let (mode, params) = read_genome(r)?;
        Ok(Self::new(mode, params, dt))
    }

    #[cfg(feature = "serde")]
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    #[cfg(feature = "serde")]
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let saved: Self = serde_json::from_str(&s)?;
        saved.decode()?;
        Ok(saved)
    }
}
