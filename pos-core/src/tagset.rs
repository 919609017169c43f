//! # Arenas de Tags e Palavras
//!
//! O Viterbi roda um laço `O(N × T²)`; fazer hash de strings dentro dele seria
//! desperdício. Por isso tags e palavras são **internadas** uma única vez no
//! treino e passam a ser representadas por índices pequenos ([`TagId`],
//! [`WordId`]), que indexam vetores diretamente.
//!
//! O id `0` de um [`TagSet`] é sempre a sentinela de início (`#` por padrão).
//! As tags reais recebem ids na ordem em que aparecem pela primeira vez no
//! corpus, e é essa ordem que define o desempate do Viterbi.

use std::collections::HashMap;

use serde::Serialize;

/// Índice de uma tag dentro de um [`TagSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TagId(usize);

impl TagId {
    /// A sentinela de início de sentença.
    pub const START: TagId = TagId(0);

    /// Posição da tag nos vetores indexados por tag.
    pub fn index(self) -> usize {
        self.0
    }

    pub fn is_start(self) -> bool {
        self == Self::START
    }
}

/// Índice de uma palavra dentro de um [`Vocabulary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WordId(usize);

impl WordId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Conjunto ordenado de tags conhecidas, com a sentinela na posição 0.
#[derive(Debug, Clone, PartialEq)]
pub struct TagSet {
    labels: Vec<String>,
    ids: HashMap<String, TagId>,
}

impl TagSet {
    /// Cria o conjunto contendo apenas a sentinela.
    pub fn new(start_tag: &str) -> Self {
        let mut set = Self {
            labels: Vec::new(),
            ids: HashMap::new(),
        };
        set.intern(start_tag);
        set
    }

    /// Retorna o id da tag, criando um novo se ela ainda não existir.
    pub fn intern(&mut self, label: &str) -> TagId {
        if let Some(&id) = self.ids.get(label) {
            return id;
        }
        let id = TagId(self.labels.len());
        self.labels.push(label.to_string());
        self.ids.insert(label.to_string(), id);
        id
    }

    pub fn get(&self, label: &str) -> Option<TagId> {
        self.ids.get(label).copied()
    }

    /// Rótulo textual de um id. Ids vêm sempre deste mesmo conjunto.
    pub fn label(&self, id: TagId) -> &str {
        &self.labels[id.0]
    }

    pub fn start_tag(&self) -> &str {
        &self.labels[0]
    }

    /// Total de tags, incluindo a sentinela.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Nunca é vazio: a sentinela está sempre presente.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Todas as tags em ordem de id, começando pela sentinela.
    pub fn iter(&self) -> impl Iterator<Item = (TagId, &str)> + '_ {
        self.labels
            .iter()
            .enumerate()
            .map(|(i, label)| (TagId(i), label.as_str()))
    }

    /// Tags reais (sem a sentinela), em ordem de id.
    pub fn real_tags(&self) -> impl Iterator<Item = (TagId, &str)> + '_ {
        self.iter().skip(1)
    }
}

/// Vocabulário de palavras vistas no treino.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vocabulary {
    words: Vec<String>,
    ids: HashMap<String, WordId>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, word: &str) -> WordId {
        if let Some(&id) = self.ids.get(word) {
            return id;
        }
        let id = WordId(self.words.len());
        self.words.push(word.to_string());
        self.ids.insert(word.to_string(), id);
        id
    }

    /// Palavras fora do vocabulário retornam `None` e levam a penalidade de emissão.
    pub fn get(&self, word: &str) -> Option<WordId> {
        self.ids.get(word).copied()
    }

    pub fn word(&self, id: WordId) -> &str {
        &self.words[id.0]
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
