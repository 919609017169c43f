//! # Erros do Etiquetador
//!
//! Todas as operações falíveis do crate retornam [`Result`], com as variantes
//! de [`PosError`] descrevendo o que deu errado. O núcleo (treino e Viterbi)
//! não faz I/O, então as únicas falhas possíveis ali são dados malformados
//! ou um caminho de tags impossível.

use thiserror::Error;

/// Erros que podem ocorrer no treino, na decodificação ou na leitura de corpus.
#[derive(Debug, Error)]
pub enum PosError {
    /// Um exemplo tem quantidades diferentes de palavras e tags.
    #[error("exemplo {example} malformado: {words} palavras para {tags} tags")]
    MalformedInput {
        /// Índice (base 0) do exemplo rejeitado.
        example: usize,
        words: usize,
        tags: usize,
    },

    /// Os dados de treino usam a tag sentinela de início como tag real.
    #[error("exemplo {example} usa a tag reservada {tag:?}")]
    ReservedTag { example: usize, tag: String },

    /// Nenhuma tag sobreviveu à expansão de transições nesta posição.
    #[error("nenhuma tag alcançável na palavra {position}")]
    ExhaustedFrontier {
        /// Índice (base 0) da palavra em que a fronteira ficou vazia.
        position: usize,
    },

    /// Configuração inconsistente (penalidade não finita, sentinela vazia...).
    #[error("configuração inválida: {0}")]
    InvalidConfig(String),

    /// Arquivos paralelos de sentenças e tags com números de linhas diferentes.
    #[error("corpus desalinhado na linha {line}: faltam linhas no arquivo de {missing}")]
    CorpusMisaligned { line: usize, missing: &'static str },

    #[error("erro de I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("erro de JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Alias de `Result` para as operações do etiquetador.
pub type Result<T> = std::result::Result<T, PosError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PosError::MalformedInput { example: 3, words: 4, tags: 5 };
        assert_eq!(err.to_string(), "exemplo 3 malformado: 4 palavras para 5 tags");

        let err = PosError::ExhaustedFrontier { position: 2 };
        assert!(err.to_string().contains("palavra 2"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PosError>();
    }
}
