//! Built-in whole-token patterns for Brazilian template documents.
//!
//! Every pattern is anchored on both ends: a token either matches entirely
//! or not at all.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Federative unit / issuing section ("PR", "GO")
    pub static ref STATE_CODE: Regex = Regex::new(
        r"^(?:AC|AL|AP|AM|BA|CE|DF|ES|GO|MA|MT|MS|MG|PA|PB|PR|PE|PI|RJ|RN|RS|RO|RR|SC|SP|SE|TO|BR)$"
    ).unwrap();

    // Money (R$ 1.234,56 / 1234,56)
    pub static ref VALOR: Regex = Regex::new(
        r"^R?\$?\s?(?:\d{1,3}(?:\.\d{3})*|\d+),\d{2}$"
    ).unwrap();

    // DD/MM/YYYY
    pub static ref DATA_BR: Regex = Regex::new(
        r"^(?:0[1-9]|[12][0-9]|3[01])[- |/](?:0[1-9]|1[0-2])[- |/][0-9]{4}$"
    ).unwrap();

    // YYYY-MM-DD
    pub static ref DATA_ISO: Regex = Regex::new(
        r"^[0-9]{4}-(?:0[1-9]|1[0-2])-(?:0[1-9]|[12][0-9]|3[01])$"
    ).unwrap();

    // Phone with optional country code, area code and two-digit prefix
    pub static ref TELEFONE_BR: Regex = Regex::new(
        r"^(?:(?:\+|00)?55\s?)?\(?\d{2}\)?\s?(?:\d{2})?-?(?:9\d|[2-9])\d{3}[-|.\s]?\d{4}$"
    ).unwrap();

    // Also accepts obfuscated "at" separators
    pub static ref EMAIL: Regex = Regex::new(
        r"^[\w.%+-]+(?:@|\s@\s|\sat\s|\[at\])[\w.-]+\.\w{2,}$"
    ).unwrap();

    // Identity card number (12.345.678-9)
    pub static ref RG: Regex = Regex::new(
        r"^\d{1,2}\.?\d{3}\.?\d{3}-?[0-9Xx]$"
    ).unwrap();

    // Driver's license: a keyword followed by an 11-digit register number
    pub static ref CNH: Regex = Regex::new(
        r"^(?:cnh|CNH|habilitação|carteira).*[0-9]{11}$"
    ).unwrap();

    pub static ref HORA12: Regex = Regex::new(
        r"^(?:0?[1-9]|1[0-2]):[0-5][0-9]\s?[aApP]\.?[mM]\.?$"
    ).unwrap();

    pub static ref HORA24: Regex = Regex::new(
        r"^(?:[01][0-9]|2[0-3]):[0-5][0-9]$"
    ).unwrap();

    pub static ref LATLONG: Regex = Regex::new(
        r"^[+-]?(?:180(?:\.0{1,6})?|(?:[0-9]|[1-9][0-9]|1[0-7][0-9])(?:\.[0-9]{1,6})?)$"
    ).unwrap();

    // Individual taxpayer id (123.456.789-09 or 12345678909)
    pub static ref CPF: Regex = Regex::new(
        r"^\d{3}\.?\d{3}\.?\d{3}-?\d{2}$"
    ).unwrap();

    // Company taxpayer id (12.345.678/0001-95)
    pub static ref CNPJ: Regex = Regex::new(
        r"^\d{2}\.?\d{3}\.?\d{3}/?\d{4}-?\d{2}$"
    ).unwrap();

    // Postal code (12345-678)
    pub static ref CEP: Regex = Regex::new(
        r"^\d{5}-?\d{3}$"
    ).unwrap();

    // Fixed-width digit runs
    pub static ref N1: Regex = Regex::new(r"^\d{1}$").unwrap();
    pub static ref N2: Regex = Regex::new(r"^\d{2}$").unwrap();
    pub static ref N3: Regex = Regex::new(r"^\d{3}$").unwrap();
    pub static ref N4: Regex = Regex::new(r"^\d{4}$").unwrap();
    pub static ref N5: Regex = Regex::new(r"^\d{5}$").unwrap();
    pub static ref N6: Regex = Regex::new(r"^\d{6}$").unwrap();
    pub static ref N7: Regex = Regex::new(r"^\d{7}$").unwrap();
    pub static ref N9: Regex = Regex::new(r"^\d{9}$").unwrap();
    pub static ref N10: Regex = Regex::new(r"^\d{10}$").unwrap();
}

/// All built-in patterns with their rule names.
pub fn builtin_patterns() -> Vec<(&'static str, &'static Regex)> {
    vec![
        ("STATE_CODE", &*STATE_CODE),
        ("VALOR", &*VALOR),
        ("DATA_BR", &*DATA_BR),
        ("DATA_ISO", &*DATA_ISO),
        ("TELEFONE_BR", &*TELEFONE_BR),
        ("EMAIL", &*EMAIL),
        ("RG", &*RG),
        ("CNH", &*CNH),
        ("HORA12", &*HORA12),
        ("HORA24", &*HORA24),
        ("LATLONG", &*LATLONG),
        ("CPF", &*CPF),
        ("CNPJ", &*CNPJ),
        ("CEP", &*CEP),
        ("N1", &*N1),
        ("N2", &*N2),
        ("N3", &*N3),
        ("N4", &*N4),
        ("N5", &*N5),
        ("N6", &*N6),
        ("N7", &*N7),
        ("N9", &*N9),
        ("N10", &*N10),
    ]
}
