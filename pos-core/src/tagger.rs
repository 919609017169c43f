//! # Etiquetador POS
//!
//! Fachada que junta normalização de texto, o modelo treinado e o Viterbi:
//!
//! 1.  **Entrada**: Sentença bruta (`"The dog barks ."`).
//! 2.  **Tokenização** ([`tokenize_sentence`]): minúsculas + divisão por espaços.
//! 3.  **Decodificação** ([`crate::viterbi`]): melhor sequência de tags.
//! 4.  **Saída**: Lista de [`TaggedWord`], ou o texto `palavra/tag` via [`render_tagged`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TaggerConfig;
use crate::corpus::TrainingExample;
use crate::error::Result;
use crate::hmm::{HmmModel, ModelSummary};
use crate::viterbi::{self, ViterbiResult};

/// Uma palavra com a tag escolhida e o score acumulado do caminho até ela.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedWord {
    pub word: String,
    pub tag: String,
    /// Soma das log-probabilidades de transição e emissão do início até esta palavra.
    pub score: f64,
}

/// Normaliza uma linha: minúsculas e divisão por espaços em branco.
pub fn tokenize_sentence(line: &str) -> Vec<String> {
    line.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Formata a saída como `palavra/tag` separados por espaço.
pub fn render_tagged(tagged: &[TaggedWord]) -> String {
    tagged
        .iter()
        .map(|t| format!("{}/{}", t.word, t.tag))
        .collect::<Vec<_>>()
        .join(" ")
}

/// O etiquetador: um [`HmmModel`] treinado, pronto para decodificar.
///
/// Só usa `&self` depois de construído, então pode ficar atrás de um `Arc`
/// e atender várias requisições ao mesmo tempo.
///
/// ```rust
/// use pos_core::{corpus::demo_corpus, PosTagger, TaggerConfig};
///
/// let tagger = PosTagger::train(&demo_corpus(), &TaggerConfig::default()).unwrap();
/// let tagged = tagger.tag("The dog saw the cat .").unwrap();
/// assert_eq!(PosTagger::render(&tagged), "the/det dog/n saw/vd the/det cat/n ./.");
/// ```
#[derive(Debug, Clone)]
pub struct PosTagger {
    model: HmmModel,
}

impl PosTagger {
    pub fn new(model: HmmModel) -> Self {
        Self { model }
    }

    /// Treina um modelo novo a partir de exemplos anotados.
    pub fn train(examples: &[TrainingExample], config: &TaggerConfig) -> Result<Self> {
        let model = HmmModel::train(examples, config)?;
        debug!(examples = examples.len(), "etiquetador pronto");
        Ok(Self::new(model))
    }

    pub fn model(&self) -> &HmmModel {
        &self.model
    }

    pub fn summary(&self) -> ModelSummary {
        self.model.summary()
    }

    /// Etiqueta uma sentença em texto livre.
    pub fn tag(&self, sentence: &str) -> Result<Vec<TaggedWord>> {
        self.tag_words(&tokenize_sentence(sentence))
    }

    /// Etiqueta uma sentença já tokenizada.
    pub fn tag_words<S: AsRef<str>>(&self, words: &[S]) -> Result<Vec<TaggedWord>> {
        viterbi::decode(&self.model, words)
    }

    /// Etiqueta e devolve também os passos do Viterbi.
    pub fn trace(&self, sentence: &str) -> Result<ViterbiResult> {
        viterbi::decode_with_trace(&self.model, &tokenize_sentence(sentence))
    }

    pub fn render(tagged: &[TaggedWord]) -> String {
        render_tagged(tagged)
    }
}
