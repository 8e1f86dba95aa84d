//! # Metadata Module
//!
//! Extracts capture metadata from photo files.
//!
//! ## Extracted Fields
//! - Capture date (DateTimeOriginal, falling back to DateTime)
//! - GPS coordinates (latitude, longitude, altitude)
//! - UTC offset (EXIF OffsetTime* tags)
//!
//! The reader is a capability interface so tests and callers can inject a
//! deterministic implementation instead of parsing real EXIF payloads.

use chrono::NaiveDateTime;
use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::MetadataError;

/// Structured metadata extracted from an image.
///
/// All fields are optional-ish: images routinely lack some or all of them.
/// GPS coordinates default to 0.0 when absent, matching EXIF convention.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageMetadata {
    /// Capture timestamp as written by the camera (naive local time)
    pub creation_date: Option<NaiveDateTime>,
    pub gps_latitude: f64,
    pub gps_longitude: f64,
    pub gps_altitude: f64,
    /// Fixed-offset label derived from the UTC offset (e.g. "UTC+05:00")
    pub timezone: Option<String>,
    /// Hours from UTC, from the EXIF OffsetTime* tags
    pub utc_offset_hours: Option<i32>,
}

impl ImageMetadata {
    /// Whether any capture metadata was found
    pub fn has_data(&self) -> bool {
        self.creation_date.is_some()
            || self.utc_offset_hours.is_some()
            || self.gps_latitude != 0.0
            || self.gps_longitude != 0.0
    }
}

/// Capability interface for reading image metadata.
pub trait MetadataReader: Send + Sync {
    /// Read capture metadata for a file.
    ///
    /// A readable file without EXIF yields an empty `ImageMetadata`;
    /// an unreadable file is an error.
    fn read(&self, path: &Path) -> Result<ImageMetadata, MetadataError>;
}

/// EXIF-backed metadata reader
#[derive(Debug, Default)]
pub struct ExifMetadataReader;

impl ExifMetadataReader {
    pub fn new() -> Self {
        Self
    }
}

impl MetadataReader for ExifMetadataReader {
    fn read(&self, path: &Path) -> Result<ImageMetadata, MetadataError> {
        let file = File::open(path).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut bufreader = BufReader::new(&file);
        let exif = match Reader::new().read_from_container(&mut bufreader) {
            Ok(exif) => exif,
            // No EXIF container is not an error - the file simply has no metadata
            Err(_) => return Ok(ImageMetadata::default()),
        };

        let mut metadata = ImageMetadata {
            creation_date: extract_creation_date(&exif),
            ..Default::default()
        };

        metadata.gps_latitude = extract_coordinate(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef);
        metadata.gps_longitude = extract_coordinate(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef);
        metadata.gps_altitude = extract_altitude(&exif);

        metadata.utc_offset_hours = extract_utc_offset(&exif);
        metadata.timezone = metadata
            .utc_offset_hours
            .map(|hours| format!("UTC{:+03}:00", hours));

        Ok(metadata)
    }
}

/// Capture date, preferring DateTimeOriginal
fn extract_creation_date(exif: &exif::Exif) -> Option<NaiveDateTime> {
    for tag in [Tag::DateTimeOriginal, Tag::DateTime] {
        if let Some(field) = exif.get_field(tag, In::PRIMARY) {
            if let Some(s) = ascii_value(&field.value) {
                // EXIF date format: "YYYY:MM:DD HH:MM:SS"
                if let Ok(parsed) = NaiveDateTime::parse_from_str(&s, "%Y:%m:%d %H:%M:%S") {
                    return Some(parsed);
                }
            }
        }
    }
    None
}

/// Degrees/minutes/seconds rationals to signed decimal degrees
fn extract_coordinate(exif: &exif::Exif, value_tag: Tag, ref_tag: Tag) -> f64 {
    let Some(field) = exif.get_field(value_tag, In::PRIMARY) else {
        return 0.0;
    };
    let Value::Rational(ref parts) = field.value else {
        return 0.0;
    };
    if parts.len() < 3 {
        return 0.0;
    }

    let degrees = parts[0].to_f64() + parts[1].to_f64() / 60.0 + parts[2].to_f64() / 3600.0;

    let hemisphere = exif
        .get_field(ref_tag, In::PRIMARY)
        .and_then(|f| ascii_value(&f.value))
        .unwrap_or_default();

    match hemisphere.as_str() {
        "S" | "W" => -degrees,
        _ => degrees,
    }
}

fn extract_altitude(exif: &exif::Exif) -> f64 {
    let Some(field) = exif.get_field(Tag::GPSAltitude, In::PRIMARY) else {
        return 0.0;
    };
    let Value::Rational(ref parts) = field.value else {
        return 0.0;
    };
    let Some(altitude) = parts.first().map(|r| r.to_f64()) else {
        return 0.0;
    };

    // GPSAltitudeRef 1 means below sea level
    let below = exif
        .get_field(Tag::GPSAltitudeRef, In::PRIMARY)
        .and_then(|f| match f.value {
            Value::Byte(ref v) => v.first().copied(),
            _ => None,
        })
        .map(|v| v == 1)
        .unwrap_or(false);

    if below {
        -altitude
    } else {
        altitude
    }
}

/// UTC offset in hours from the OffsetTime* tags (format "+05:00")
fn extract_utc_offset(exif: &exif::Exif) -> Option<i32> {
    for tag in [
        Tag::OffsetTime,
        Tag::OffsetTimeOriginal,
        Tag::OffsetTimeDigitized,
    ] {
        if let Some(field) = exif.get_field(tag, In::PRIMARY) {
            if let Some(s) = ascii_value(&field.value) {
                if let Some(hours) = parse_offset_hours(&s) {
                    return Some(hours);
                }
            }
        }
    }
    None
}

fn parse_offset_hours(offset: &str) -> Option<i32> {
    let hours: &str = offset.split(':').next()?;
    hours.trim().parse::<i32>().ok()
}

fn ascii_value(value: &Value) -> Option<String> {
    if let Value::Ascii(ref vec) = value {
        if let Some(bytes) = vec.first() {
            if let Ok(s) = std::str::from_utf8(bytes) {
                let trimmed = s.trim_end_matches('\0').trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
    }
    None
}
