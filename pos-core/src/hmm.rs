//! # Hidden Markov Model para Etiquetagem POS
//!
//! Implementação clássica de HMM de primeira ordem onde:
//! - **Estados Ocultos**: Tags morfossintáticas (n, v, det, ...)
//! - **Observações**: Palavras em minúsculas
//!
//! O modelo aprende, por máxima verossimilhança (contagem simples):
//! 1. Probabilidade de Transição: P(tag_atual | tag_anterior), com a sentinela
//!    `#` fazendo o papel de "tag anterior" da primeira palavra.
//! 2. Probabilidade de Emissão: P(palavra | tag), uma linha por tag real.
//!
//! Não há suavização de Laplace: pares não observados simplesmente não existem
//! nas tabelas. Na decodificação, emissões ausentes recebem a penalidade fixa
//! de [`TaggerConfig::unseen_penalty`] e transições ausentes tornam a tag
//! inalcançável (ver [`crate::viterbi`]).

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::config::TaggerConfig;
use crate::corpus::TrainingExample;
use crate::error::{PosError, Result};
use crate::tagset::{TagId, TagSet, Vocabulary, WordId};

/// Uma linha de uma tabela de log-probabilidades, ordenada pela chave.
///
/// Guarda `ln(count / total)` para cada chave observada; somando `exp` de
/// todas as entradas obtém-se 1 (a menos de erro de ponto flutuante).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRow<K> {
    entries: Vec<(K, f64)>,
}

impl<K: Ord + Copy> LogRow<K> {
    /// Converte contagens brutas em log-probabilidades relativas ao total da linha.
    ///
    /// Uma entrada só existe junto com uma contagem >= 1, então o total
    /// nunca é zero quando há entradas e `ln(0)` não ocorre.
    fn from_counts(counts: &BTreeMap<K, u64>) -> Self {
        let total: u64 = counts.values().sum();
        let entries = counts
            .iter()
            .map(|(&key, &count)| (key, (count as f64 / total as f64).ln()))
            .collect();
        Self { entries }
    }

    pub fn get(&self, key: K) -> Option<f64> {
        self.entries
            .binary_search_by(|(k, _)| k.cmp(&key))
            .ok()
            .map(|i| self.entries[i].1)
    }

    /// Entradas em ordem crescente de chave.
    pub fn entries(&self) -> &[(K, f64)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Soma das probabilidades da linha (≈ 1.0 para toda linha não vazia).
    pub fn total_probability(&self) -> f64 {
        self.entries.iter().map(|(_, lp)| lp.exp()).sum()
    }
}

/// $\ln P(palavra | tag)$, uma linha por tag (a linha da sentinela é sempre vazia).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmissionTable {
    rows: Vec<LogRow<WordId>>,
}

impl EmissionTable {
    pub fn row(&self, tag: TagId) -> &LogRow<WordId> {
        &self.rows[tag.index()]
    }

    /// `None` quando a tag nunca emitiu a palavra no treino.
    pub fn log_prob(&self, tag: TagId, word: WordId) -> Option<f64> {
        self.rows.get(tag.index()).and_then(|row| row.get(word))
    }
}

/// $\ln P(tag_i | tag_{i-1})$, uma linha por tag anterior (incluindo a sentinela).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionTable {
    rows: Vec<LogRow<TagId>>,
}

impl TransitionTable {
    pub fn row(&self, tag: TagId) -> &LogRow<TagId> {
        &self.rows[tag.index()]
    }

    /// Tags observadas logo após `tag` no treino, com suas log-probabilidades.
    /// São as únicas candidatas que o Viterbi expande a partir de `tag`.
    pub fn followers(&self, tag: TagId) -> &[(TagId, f64)] {
        self.rows
            .get(tag.index())
            .map(|row| row.entries())
            .unwrap_or(&[])
    }

    pub fn log_prob(&self, from: TagId, to: TagId) -> Option<f64> {
        self.rows.get(from.index()).and_then(|row| row.get(to))
    }
}

/// Acumulador de frequências usado durante o treino.
///
/// Pode ser alimentado exemplo a exemplo; cada exemplo é validado antes de
/// qualquer contador ser tocado, então um exemplo rejeitado deixa o
/// treinador exatamente como estava.
///
/// ```rust
/// use pos_core::config::TaggerConfig;
/// use pos_core::hmm::HmmTrainer;
///
/// let mut trainer = HmmTrainer::new(&TaggerConfig::default()).unwrap();
/// trainer.add_example(&["The", "dog"], &["DET", "N"]).unwrap();
/// assert!(trainer.add_example(&["oops"], &["n", "v"]).is_err());
///
/// let model = trainer.finish();
/// assert_eq!(model.transition_log_prob("det", "n"), Some(0.0));
/// ```
#[derive(Debug, Clone)]
pub struct HmmTrainer {
    config: TaggerConfig,
    tags: TagSet,
    vocab: Vocabulary,
    emission_counts: Vec<BTreeMap<WordId, u64>>,
    transition_counts: Vec<BTreeMap<TagId, u64>>,
    examples_seen: usize,
}

impl HmmTrainer {
    pub fn new(config: &TaggerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            tags: TagSet::new(&config.start_tag),
            vocab: Vocabulary::new(),
            emission_counts: vec![BTreeMap::new()],
            transition_counts: vec![BTreeMap::new()],
            examples_seen: 0,
        })
    }

    /// Número de exemplos aceitos até agora.
    pub fn examples_seen(&self) -> usize {
        self.examples_seen
    }

    /// Conta as emissões e transições de uma sentença anotada.
    ///
    /// Palavras e tags são normalizadas para minúsculas aqui, uma única vez.
    pub fn add_example<W, T>(&mut self, words: &[W], tags: &[T]) -> Result<()>
    where
        W: AsRef<str>,
        T: AsRef<str>,
    {
        let example = self.examples_seen;
        validate_example(example, words, tags, &self.config.start_tag)?;

        let mut prev = TagId::START;
        for (word, tag) in words.iter().zip(tags) {
            let word = self.vocab.intern(&word.as_ref().to_lowercase());
            let tag = self.intern_tag(&tag.as_ref().to_lowercase());

            // Emissão: quantas vezes a tag gerou a palavra?
            *self.emission_counts[tag.index()].entry(word).or_insert(0) += 1;
            // Transição: quantas vezes `prev` foi seguida por `tag`? (`#` na primeira palavra)
            *self.transition_counts[prev.index()].entry(tag).or_insert(0) += 1;

            prev = tag;
        }

        self.examples_seen += 1;
        Ok(())
    }

    fn intern_tag(&mut self, label: &str) -> TagId {
        let id = self.tags.intern(label);
        if id.index() == self.emission_counts.len() {
            self.emission_counts.push(BTreeMap::new());
            self.transition_counts.push(BTreeMap::new());
        }
        id
    }

    /// Converte as contagens em log-probabilidades e descarta os acumuladores.
    pub fn finish(self) -> HmmModel {
        let emissions = EmissionTable {
            rows: self.emission_counts.iter().map(LogRow::from_counts).collect(),
        };
        let transitions = TransitionTable {
            rows: self.transition_counts.iter().map(LogRow::from_counts).collect(),
        };

        debug!(
            examples = self.examples_seen,
            tags = self.tags.len() - 1,
            vocabulary = self.vocab.len(),
            start_followers = transitions.followers(TagId::START).len(),
            "HMM treinado"
        );

        HmmModel {
            config: self.config,
            tags: self.tags,
            vocab: self.vocab,
            emissions,
            transitions,
        }
    }
}

/// Rejeita exemplos com tamanhos diferentes ou que usam a sentinela como tag real.
fn validate_example<W, T>(example: usize, words: &[W], tags: &[T], start_tag: &str) -> Result<()>
where
    W: AsRef<str>,
    T: AsRef<str>,
{
    if words.len() != tags.len() {
        return Err(PosError::MalformedInput {
            example,
            words: words.len(),
            tags: tags.len(),
        });
    }
    if let Some(tag) = tags.iter().find(|t| t.as_ref().to_lowercase() == start_tag) {
        return Err(PosError::ReservedTag {
            example,
            tag: tag.as_ref().to_string(),
        });
    }
    Ok(())
}

/// Modelo HMM treinado e imutável.
///
/// # Tabelas
/// Cada linha guarda só os pares observados, ordenados por id, já como
/// `ln(contagem / total da linha)`. A decodificação soma esses valores; um par
/// ausente não tem entrada, nem de emissão nem de transição.
///
/// O modelo é `Send + Sync` e pode ser compartilhado entre várias
/// decodificações simultâneas sem trava: o Viterbi só o lê.
#[derive(Debug, Clone, PartialEq)]
pub struct HmmModel {
    config: TaggerConfig,
    tags: TagSet,
    vocab: Vocabulary,
    emissions: EmissionTable,
    transitions: TransitionTable,
}

impl HmmModel {
    /// Treina o HMM com o corpus fornecido (aprendizado supervisionado).
    ///
    /// # Processo de Treinamento
    /// 1. **Validação**: todos os exemplos são checados antes de qualquer contagem.
    ///    Um exemplo malformado faz o treino inteiro falhar, sem modelo parcial.
    /// 2. **Contagem**: emissões (tag, palavra) e transições (tag anterior, tag).
    /// 3. **Log-Probabilidades**: `ln(contagem / total da linha)`.
    pub fn train(examples: &[TrainingExample], config: &TaggerConfig) -> Result<Self> {
        config.validate()?;
        for (i, example) in examples.iter().enumerate() {
            validate_example(i, &example.words, &example.tags, &config.start_tag)?;
        }

        let mut trainer = HmmTrainer::new(config)?;
        for example in examples {
            trainer.add_example(&example.words, &example.tags)?;
        }
        Ok(trainer.finish())
    }

    pub fn config(&self) -> &TaggerConfig {
        &self.config
    }

    pub fn unseen_penalty(&self) -> f64 {
        self.config.unseen_penalty
    }

    /// Mesmo modelo com outra penalidade para emissões não vistas.
    pub fn with_unseen_penalty(mut self, penalty: f64) -> Result<Self> {
        let config = self.config.clone().with_unseen_penalty(penalty);
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn emissions(&self) -> &EmissionTable {
        &self.emissions
    }

    pub fn transitions(&self) -> &TransitionTable {
        &self.transitions
    }

    /// Consulta por texto, útil em testes e na inspeção do modelo.
    pub fn emission_log_prob(&self, tag: &str, word: &str) -> Option<f64> {
        let tag = self.tags.get(tag)?;
        let word = self.vocab.get(word)?;
        self.emissions.log_prob(tag, word)
    }

    pub fn transition_log_prob(&self, from: &str, to: &str) -> Option<f64> {
        let from = self.tags.get(from)?;
        let to = self.tags.get(to)?;
        self.transitions.log_prob(from, to)
    }

    /// Todas as emissões como `(tag, palavra, log-prob)`, em ordem de id.
    pub fn emission_entries(&self) -> impl Iterator<Item = (&str, &str, f64)> + '_ {
        self.tags.real_tags().flat_map(move |(tag, label)| {
            self.emissions
                .row(tag)
                .entries()
                .iter()
                .map(move |&(word, lp)| (label, self.vocab.word(word), lp))
        })
    }

    /// Todas as transições como `(tag anterior, tag, log-prob)`, começando pela sentinela.
    pub fn transition_entries(&self) -> impl Iterator<Item = (&str, &str, f64)> + '_ {
        self.tags.iter().flat_map(move |(from, from_label)| {
            self.transitions
                .row(from)
                .entries()
                .iter()
                .map(move |&(to, lp)| (from_label, self.tags.label(to), lp))
        })
    }

    /// Resumo serializável para inspeção (CLI e API web).
    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            start_tag: self.tags.start_tag().to_string(),
            unseen_penalty: self.config.unseen_penalty,
            tags: self.tags.real_tags().map(|(_, l)| l.to_string()).collect(),
            vocabulary_size: self.vocab.len(),
            emission_entries: self.emissions.rows.iter().map(LogRow::len).sum(),
            transition_entries: self.transitions.rows.iter().map(LogRow::len).sum(),
        }
    }
}

/// Estatísticas de um [`HmmModel`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelSummary {
    pub start_tag: String,
    pub unseen_penalty: f64,
    pub tags: Vec<String>,
    pub vocabulary_size: usize,
    pub emission_entries: usize,
    pub transition_entries: usize,
}
