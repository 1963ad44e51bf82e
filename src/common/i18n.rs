// src/common/i18n.rs

use std::collections::HashMap;

pub const DEFAULT_LANG: &str = "en";

// Catálogo das mensagens de topo do envelope de erro.
// Os detalhes por campo (validator) continuam no idioma do formulário.
const EN: &[(&str, &str)] = &[
    ("validation", "One or more fields are invalid."),
    ("not_found", "Record not found."),
    ("unknown_slot", "Unknown attachment field."),
    ("attachment_not_found", "File not found."),
    ("conflict", "A record with this serial number already exists."),
    ("no_files", "No files found for the selected record(s)."),
    ("invalid_token", "Invalid or missing authentication token."),
    ("forbidden", "You do not have permission to perform this action."),
    ("bad_request", "Invalid request."),
    ("internal", "An unexpected error occurred."),
];

const PT: &[(&str, &str)] = &[
    ("validation", "Um ou mais campos são inválidos."),
    ("not_found", "Registro não encontrado."),
    ("unknown_slot", "Campo de anexo desconhecido."),
    ("attachment_not_found", "Arquivo não encontrado."),
    ("conflict", "Já existe um registro com este número de série."),
    ("no_files", "Nenhum arquivo encontrado para o(s) registro(s) selecionado(s)."),
    ("invalid_token", "Token de autenticação inválido ou ausente."),
    ("forbidden", "Você não tem permissão para realizar esta ação."),
    ("bad_request", "Requisição inválida."),
    ("internal", "Ocorreu um erro inesperado."),
];

#[derive(Debug, Clone)]
pub struct I18nStore {
    messages: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl I18nStore {
    pub fn new() -> Self {
        let mut messages = HashMap::new();
        messages.insert("en", EN.iter().copied().collect());
        messages.insert("pt", PT.iter().copied().collect());
        Self { messages }
    }

    /// Traduz `key`; cai para inglês e, por fim, para a própria chave.
    pub fn translate(&self, lang: &str, key: &str) -> String {
        self.messages
            .get(lang)
            .and_then(|m| m.get(key))
            .or_else(|| self.messages.get(DEFAULT_LANG).and_then(|m| m.get(key)))
            .map(|s| s.to_string())
            .unwrap_or_else(|| key.to_string())
    }
}

impl Default for I18nStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_english_then_key() {
        let store = I18nStore::new();
        assert_eq!(store.translate("pt", "not_found"), "Registro não encontrado.");
        assert_eq!(store.translate("fr", "not_found"), "Record not found.");
        assert_eq!(store.translate("en", "missing_key"), "missing_key");
    }

    #[test]
    fn catalogs_have_the_same_keys() {
        let en: Vec<_> = EN.iter().map(|(k, _)| *k).collect();
        let pt: Vec<_> = PT.iter().map(|(k, _)| *k).collect();
        assert_eq!(en, pt);
    }
}
