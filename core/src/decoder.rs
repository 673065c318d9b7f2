//! Response body decoders.
//!
//! # Design
//! Decoders stream straight from the body reader into the destination type
//! and return the format parser's own error unchanged. Empty or truncated
//! bodies are left for the parser to reject.

use std::io::{BufReader, Read};

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Format used to deserialize response bodies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseDecoder {
    #[default]
    Json,
    Xml,
}

impl ResponseDecoder {
    pub fn decode<T: DeserializeOwned, R: Read>(&self, reader: R) -> Result<T> {
        match self {
            ResponseDecoder::Json => serde_json::from_reader(reader).map_err(Error::DecodeJson),
            ResponseDecoder::Xml => {
                quick_xml::de::from_reader(BufReader::new(reader)).map_err(Error::DecodeXml)
            }
        }
    }
}
