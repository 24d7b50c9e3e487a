use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use sokoban_core::{Level, LevelError, LevelLayout};
use thiserror::Error;

const CODE_DOMAIN: &str = "sokoban";
const CODE_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded level payload.
pub(crate) const CODE_HEADER: &str = "sokoban:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Errors that can occur while encoding or decoding level codes.
#[derive(Debug, Error)]
pub(crate) enum TransferError {
    #[error("level code was empty")]
    EmptyPayload,
    #[error("level code is missing the {0}")]
    MissingField(&'static str),
    #[error("level code prefix '{0}' is not supported")]
    InvalidPrefix(String),
    #[error("level code version '{0}' is not supported")]
    UnsupportedVersion(String),
    #[error("could not parse grid dimensions '{0}'")]
    InvalidDimensions(String),
    #[error("could not decode level payload")]
    InvalidEncoding(#[source] base64::DecodeError),
    #[error("could not parse level payload")]
    InvalidPayload(#[source] serde_json::Error),
    #[error("level payload places an element outside the {width}x{height} grid")]
    OutOfBounds { width: u32, height: u32 },
    #[error(transparent)]
    Level(#[from] LevelError),
}

/// Encodes `level` into a single line suitable for clipboard transfer.
pub(crate) fn encode(level: &Level) -> Result<String, TransferError> {
    let json = serde_json::to_vec(level.layout()).map_err(TransferError::InvalidPayload)?;
    let encoded = STANDARD_NO_PAD.encode(json);
    Ok(format!(
        "{CODE_HEADER}:{}x{}:{encoded}",
        level.width(),
        level.height()
    ))
}

/// Decodes a level from its transfer code.
pub(crate) fn decode(value: &str) -> Result<Level, TransferError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TransferError::EmptyPayload);
    }

    let mut parts = trimmed.split(FIELD_DELIMITER);
    let domain = parts.next().ok_or(TransferError::MissingField("prefix"))?;
    let version = parts.next().ok_or(TransferError::MissingField("version"))?;
    let dimensions = parts
        .next()
        .ok_or(TransferError::MissingField("grid dimensions"))?;
    let payload = parts.next().ok_or(TransferError::MissingField("payload"))?;

    if domain != CODE_DOMAIN {
        return Err(TransferError::InvalidPrefix(domain.to_owned()));
    }
    if version != CODE_VERSION {
        return Err(TransferError::UnsupportedVersion(version.to_owned()));
    }

    let (width, height) = parse_dimensions(dimensions)?;
    let bytes = STANDARD_NO_PAD
        .decode(payload.as_bytes())
        .map_err(TransferError::InvalidEncoding)?;
    let layout: LevelLayout =
        serde_json::from_slice(&bytes).map_err(TransferError::InvalidPayload)?;

    let level = Level::new(width, height, layout)?;
    let dimensions = level.dimensions();
    if !level
        .layout()
        .all_positions()
        .all(|cell| dimensions.contains(cell))
    {
        return Err(TransferError::OutOfBounds { width, height });
    }
    Ok(level)
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), TransferError> {
    let invalid = || TransferError::InvalidDimensions(dimensions.to_owned());
    let (width, height) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;

    let width = width.trim().parse::<u32>().map_err(|_| invalid())?;
    let height = height.trim().parse::<u32>().map_err(|_| invalid())?;

    if width == 0 || height == 0 {
        return Err(invalid());
    }

    Ok((width, height))
}
