//! Encoding of a [`LocalizableKey`] into a single table cell and back.
//!
//! The cell reads `{unit_id}:{type_name}.{property_name}`. Unit ids may contain both
//! `.` and `:`, so decoding splits on the *last* `:` first, then on the *last* `.`
//! of the remainder.

use crate::{error::Error, types::LocalizableKey};

/// Separator between the unit id and the qualified property.
pub const KEY_SEPARATOR: char = ':';

/// Separator between the type name and the property name.
pub const PROPERTY_SEPARATOR: char = '.';

/// Encodes a key as `{unit_id}:{type_name}.{property_name}`.
pub fn encode_key(key: &LocalizableKey) -> String {
    format!(
        "{}{}{}{}{}",
        key.unit_id, KEY_SEPARATOR, key.type_name, PROPERTY_SEPARATOR, key.property_name
    )
}

/// Decodes a table cell into a key.
///
/// Fails with [`Error::MalformedKey`] when the cell has no `:`, when its last `.` sits
/// at or before the last `:`, or when the last `.` is the final character.
pub fn decode_key(cell: &str) -> Result<LocalizableKey, Error> {
    let malformed = || Error::MalformedKey {
        key: cell.to_string(),
        row: None,
    };

    let id_end = cell.rfind(KEY_SEPARATOR).ok_or_else(malformed)?;
    let class_end = cell.rfind(PROPERTY_SEPARATOR).ok_or_else(malformed)?;
    if class_end <= id_end || class_end + PROPERTY_SEPARATOR.len_utf8() == cell.len() {
        return Err(malformed());
    }

    Ok(LocalizableKey {
        unit_id: cell[..id_end].to_string(),
        type_name: cell[id_end + KEY_SEPARATOR.len_utf8()..class_end].to_string(),
        property_name: cell[class_end + PROPERTY_SEPARATOR.len_utf8()..].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_key() {
        let key = LocalizableKey::new("id1", "Ty", "Prop");
        assert_eq!(encode_key(&key), "id1:Ty.Prop");
    }

    #[test]
    fn test_decode_key_with_dotted_unit_id() {
        let key = decode_key("a.b:Ty.Prop").unwrap();
        assert_eq!(key, LocalizableKey::new("a.b", "Ty", "Prop"));
    }

    #[test]
    fn test_decode_key_uses_last_colon() {
        let key = decode_key("Button_1:Click:System.Windows.Controls.Button.$Content").unwrap();
        assert_eq!(key.unit_id, "Button_1:Click");
        assert_eq!(key.type_name, "System.Windows.Controls.Button");
        assert_eq!(key.property_name, "$Content");
    }

    #[test]
    fn test_decode_key_allows_empty_type_name() {
        let key = decode_key("id:.Prop").unwrap();
        assert_eq!(key.type_name, "");
        assert_eq!(key.property_name, "Prop");
    }

    #[test]
    fn test_decode_key_without_colon_fails() {
        assert!(matches!(
            decode_key("Ty.Prop"),
            Err(Error::MalformedKey { .. })
        ));
    }

    #[test]
    fn test_decode_key_dot_before_colon_fails() {
        assert!(decode_key("a.b:TyProp").is_err());
    }

    #[test]
    fn test_decode_key_trailing_dot_fails() {
        assert!(decode_key("id:Ty.").is_err());
        assert!(decode_key("").is_err());
    }

    #[test]
    fn test_encode_decode_preserves_awkward_ids() {
        let key = LocalizableKey::new("x:y.z", "Ns.Type", "Prop");
        assert_eq!(decode_key(&encode_key(&key)).unwrap(), key);
    }
}
