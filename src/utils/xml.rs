//! Small helpers shared by the quick-xml based parsers

use quick_xml::events::{BytesCData, BytesStart, BytesText};

use crate::domain::Result;

/// Value of the attribute with local name `name`, unescaped.
pub fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

pub fn text(e: &BytesText<'_>) -> Result<String> {
    Ok(e.unescape()?.into_owned())
}

pub fn cdata(e: &BytesCData<'_>) -> String {
    String::from_utf8_lossy(e).into_owned()
}

pub fn local_name(e: &BytesStart<'_>) -> Vec<u8> {
    e.local_name().as_ref().to_vec()
}
