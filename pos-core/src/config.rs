//! # Configuração do Etiquetador
//!
//! O HMM tem apenas dois parâmetros ajustáveis:
//!
//! | Campo            | Padrão   | Efeito                                                    |
//! |------------------|----------|-----------------------------------------------------------|
//! | `unseen_penalty` | `-100.0` | log-prob usada para P(palavra \| tag) nunca observada     |
//! | `start_tag`      | `#`      | tag sentinela que antecede a primeira palavra da sentença |
//!
//! A penalidade muda bastante a etiquetagem de palavras fora do vocabulário:
//! quanto mais negativa, mais o Viterbi confia só nas transições para elas.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PosError, Result};

/// log-prob padrão de emissão para pares (tag, palavra) não vistos no treino.
pub const DEFAULT_UNSEEN_PENALTY: f64 = -100.0;

/// Tag sentinela padrão de início de sentença.
pub const DEFAULT_START_TAG: &str = "#";

/// Parâmetros do treino e da decodificação.
///
/// Pode ser carregada de JSON; campos ausentes assumem os valores padrão:
///
/// ```rust
/// use pos_core::config::TaggerConfig;
///
/// let config = TaggerConfig::from_json_str(r#"{ "unseen_penalty": -20.0 }"#).unwrap();
/// assert_eq!(config.unseen_penalty, -20.0);
/// assert_eq!(config.start_tag, "#");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaggerConfig {
    /// Penalidade (log-space) para emissões não observadas. Deve ser finita e <= 0.
    pub unseen_penalty: f64,
    /// Sentinela de início. Não pode coincidir com nenhuma tag real do corpus.
    pub start_tag: String,
}

impl Default for TaggerConfig {
    fn default() -> Self {
        Self {
            unseen_penalty: DEFAULT_UNSEEN_PENALTY,
            start_tag: DEFAULT_START_TAG.to_string(),
        }
    }
}

impl TaggerConfig {
    /// Substitui a penalidade de palavras não vistas.
    pub fn with_unseen_penalty(mut self, penalty: f64) -> Self {
        self.unseen_penalty = penalty;
        self
    }

    /// Substitui a sentinela de início (normalizada para minúsculas).
    pub fn with_start_tag(mut self, tag: impl Into<String>) -> Self {
        self.start_tag = tag.into().to_lowercase();
        self
    }

    /// Verifica se os valores fazem sentido antes do treino.
    pub fn validate(&self) -> Result<()> {
        if !self.unseen_penalty.is_finite() {
            return Err(PosError::InvalidConfig(format!(
                "unseen_penalty precisa ser finita, recebido {}",
                self.unseen_penalty
            )));
        }
        if self.unseen_penalty > 0.0 {
            return Err(PosError::InvalidConfig(format!(
                "unseen_penalty é uma log-probabilidade e não pode ser positiva, recebido {}",
                self.unseen_penalty
            )));
        }
        if self.start_tag.is_empty() || self.start_tag.chars().any(char::is_whitespace) {
            return Err(PosError::InvalidConfig(format!(
                "start_tag precisa ser um token sem espaços, recebido {:?}",
                self.start_tag
            )));
        }
        if self.start_tag != self.start_tag.to_lowercase() {
            return Err(PosError::InvalidConfig(format!(
                "start_tag precisa estar em minúsculas, recebido {:?}",
                self.start_tag
            )));
        }
        Ok(())
    }

    /// Lê e valida a configuração a partir de uma string JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Lê e valida a configuração a partir de um arquivo JSON.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
