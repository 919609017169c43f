//! # Avaliação contra Tags de Referência
//!
//! Conta quantas tags o etiquetador acertou comparando a saída do Viterbi com
//! as tags "ouro" de um corpus anotado.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::corpus::TrainingExample;
use crate::error::{PosError, Result};
use crate::tagger::{PosTagger, TaggedWord};

/// Contadores de acertos e erros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub total: usize,
    pub correct: usize,
    pub wrong: usize,
    /// Sentenças avaliadas (incluindo as que falharam)
    pub sentences: usize,
    /// Sentenças sem caminho viável; todas as suas tags contam como erradas
    pub failed_sentences: usize,
}

impl Evaluation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compara uma sentença etiquetada com as tags de referência.
    ///
    /// `example` só é usado na mensagem de erro quando os tamanhos diferem.
    pub fn record_sentence<S: AsRef<str>>(&mut self, example: usize, predicted: &[TaggedWord], gold: &[S]) -> Result<()> {
        if predicted.len() != gold.len() {
            return Err(PosError::MalformedInput {
                example,
                words: predicted.len(),
                tags: gold.len(),
            });
        }

        let correct = predicted
            .iter()
            .zip(gold)
            .filter(|(p, g)| p.tag == g.as_ref().to_lowercase())
            .count();

        self.total += gold.len();
        self.correct += correct;
        self.wrong += gold.len() - correct;
        self.sentences += 1;
        Ok(())
    }

    /// Registra uma sentença que não pôde ser decodificada.
    pub fn record_failure(&mut self, words: usize) {
        self.total += words;
        self.wrong += words;
        self.sentences += 1;
        self.failed_sentences += 1;
    }

    /// Fração de tags corretas (0.0 quando nada foi avaliado).
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.correct as f64 / self.total as f64
    }

    pub fn merge(&mut self, other: &Evaluation) {
        self.total += other.total;
        self.correct += other.correct;
        self.wrong += other.wrong;
        self.sentences += other.sentences;
        self.failed_sentences += other.failed_sentences;
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Total de tags: {}", self.total)?;
        writeln!(f, "# Corretas: {}", self.correct)?;
        writeln!(f, "# Erradas: {}", self.wrong)?;
        if self.failed_sentences > 0 {
            writeln!(f, "# Sentenças sem caminho: {}", self.failed_sentences)?;
        }
        write!(f, "# Acurácia: {:.2}%", self.accuracy() * 100.0)
    }
}

/// Etiqueta cada exemplo e acumula os acertos.
///
/// Sentenças sem caminho viável ([`PosError::ExhaustedFrontier`]) não
/// interrompem a avaliação: são registradas como falhas. Exemplos com
/// palavras e tags de tamanhos diferentes interrompem.
pub fn evaluate(tagger: &PosTagger, examples: &[TrainingExample]) -> Result<Evaluation> {
    let mut evaluation = Evaluation::new();

    for (i, example) in examples.iter().enumerate() {
        if example.words.len() != example.tags.len() {
            return Err(PosError::MalformedInput {
                example: i,
                words: example.words.len(),
                tags: example.tags.len(),
            });
        }

        match tagger.tag_words(&example.words) {
            Ok(tagged) => evaluation.record_sentence(i, &tagged, &example.tags)?,
            Err(PosError::ExhaustedFrontier { position }) => {
                warn!(example = i, position, "sentença sem caminho viável");
                evaluation.record_failure(example.words.len());
            }
            Err(e) => return Err(e),
        }
    }

    Ok(evaluation)
}
