//! Field-name prefilter.
//!
//! A field whose name shares no word with the document text is assumed absent
//! and nulled before resolution.

use std::collections::BTreeSet;

use crate::models::document::{ExtractionSchema, FieldValues};

/// Lowercase, fold accents, treat `-` and `_` as spaces and split on whitespace.
pub fn decompose(text: &str) -> Vec<String> {
    let normalized: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .map(fold_accent)
        .map(|c| if c == '-' || c == '_' { ' ' } else { c })
        .collect();

    normalized.split_whitespace().map(str::to_string).collect()
}

/// Split a schema into the fields worth resolving and the ones nulled up front.
pub fn split_viable(schema: &ExtractionSchema, text: &str) -> (ExtractionSchema, FieldValues) {
    let words: BTreeSet<String> = decompose(text).into_iter().collect();

    let mut viable = ExtractionSchema::new();
    let mut nulled = FieldValues::new();
    for (field, description) in schema {
        if decompose(field).iter().any(|w| words.contains(w)) {
            viable.insert(field.clone(), description.clone());
        } else {
            nulled.insert(field.clone(), None);
        }
    }
    (viable, nulled)
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decompose() {
        assert_eq!(
            decompose("Data_Emissão  do-RG"),
            vec!["data", "emissao", "do", "rg"]
        );
        assert!(decompose("  \n ").is_empty());
    }

    #[test]
    fn test_split_viable() {
        let schema = ExtractionSchema::from([
            ("nome".to_string(), "Nome completo".to_string()),
            ("data_emissao".to_string(), "Data de emissão".to_string()),
            ("placa_veiculo".to_string(), "Placa".to_string()),
        ]);
        let text = "NOME MARIA DA SILVA\nDATA DE EMISSÃO 04/02/2021";

        let (viable, nulled) = split_viable(&schema, text);

        assert_eq!(
            viable.keys().collect::<Vec<_>>(),
            vec!["data_emissao", "nome"]
        );
        assert_eq!(
            nulled,
            FieldValues::from([("placa_veiculo".to_string(), None)])
        );
    }
}
