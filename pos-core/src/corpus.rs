//! # Corpus Paralelo de Sentenças e Tags
//!
//! O formato de treino é o clássico par de arquivos alinhados linha a linha:
//!
//! ```text
//! sentences.txt                  tags.txt
//! The dog saw the cat .          DET N VD DET N .
//! She likes the red car .        PRO V DET ADJ N .
//! ```
//!
//! Cada linha é uma sentença, tokenizada por espaços em branco. Palavras e
//! tags são normalizadas para minúsculas na leitura. Este módulo só lê e
//! alinha; quem garante que cada linha tem o mesmo número de palavras e tags
//! é o treino ([`crate::hmm::HmmModel::train`]).
//!
//! Também inclui um pequeno corpus em inglês embutido (tagset simplificado do
//! Brown), usado pela interface web e pela CLI quando nenhum arquivo é dado.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PosError, Result};
use crate::tagger::tokenize_sentence;

/// Uma sentença anotada: palavras e tags alinhadas por posição.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub words: Vec<String>,
    pub tags: Vec<String>,
}

impl TrainingExample {
    pub fn new(words: Vec<String>, tags: Vec<String>) -> Self {
        Self { words, tags }
    }

    /// Monta o exemplo a partir de uma linha de sentença e sua linha de tags.
    pub fn from_lines(sentence: &str, tags: &str) -> Self {
        Self {
            words: tokenize_sentence(sentence),
            tags: tokenize_sentence(tags),
        }
    }

    /// Número de palavras da sentença.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Lê dois fluxos paralelos (sentenças e tags) e os alinha linha a linha.
///
/// Pares de linhas em branco são ignorados. Uma sentença em branco com tags
/// na linha correspondente é [`PosError::MalformedInput`]. Se um dos fluxos acabar antes do outro (desconsiderando
/// linhas em branco no final), retorna [`PosError::CorpusMisaligned`].
pub fn read_parallel<S: BufRead, T: BufRead>(sentences: S, tags: T) -> Result<Vec<TrainingExample>> {
    let mut examples = Vec::new();
    let mut tag_lines = tags.lines();
    let mut line = 0;

    for sentence in sentences.lines() {
        let sentence = sentence?;
        line += 1;

        let tag_line = match tag_lines.next() {
            Some(tag_line) => tag_line?,
            None if sentence.trim().is_empty() => continue,
            None => return Err(PosError::CorpusMisaligned { line, missing: "tags" }),
        };

        if sentence.trim().is_empty() {
            // Sentença vazia só pode ser pulada junto com uma linha de tags vazia
            let tags = tag_line.split_whitespace().count();
            if tags > 0 {
                return Err(PosError::MalformedInput { example: examples.len(), words: 0, tags });
            }
            continue;
        }
        examples.push(TrainingExample::from_lines(&sentence, &tag_line));
    }

    // Sobras no arquivo de tags só são aceitas se forem linhas em branco
    for tag_line in tag_lines {
        line += 1;
        if !tag_line?.trim().is_empty() {
            return Err(PosError::CorpusMisaligned { line, missing: "sentenças" });
        }
    }

    Ok(examples)
}

/// Abre e lê um par de arquivos paralelos.
pub fn load_parallel_files(sentences: impl AsRef<Path>, tags: impl AsRef<Path>) -> Result<Vec<TrainingExample>> {
    let sentences = BufReader::new(File::open(sentences)?);
    let tags = BufReader::new(File::open(tags)?);
    read_parallel(sentences, tags)
}

const DEMO_SENTENCES: &str = "\
The dog saw the cat .
A cat chases the mouse in the house .
The old man walks to the store every day .
She likes the red car .
We will go home tomorrow .
The children played in the park .
He is reading a good book .
My dog likes to run .
They saw a big dog in the street .
The cat sleeps on the warm bed .
John gave Mary a book .
The students have finished the test .
Can you see the bird ?
The bird flies over the tall tree .
I will watch the game and you will read .
The man quickly opened the door .
Where is the old dog ?
The dog barks at the mailman .
Three cats watched the fish .
A small boy was playing with the dog .
She quickly ran to the house .
The fish swims in the water .
We saw the movie and we liked it .
The coach gave the students a test .
Dogs and cats are animals .";

const DEMO_TAGS: &str = "\
DET N VD DET N .
DET N V DET N P DET N .
DET ADJ N V P DET N DET N .
PRO V DET ADJ N .
PRO MOD V ADV N .
DET N VD P DET N .
PRO V VG DET ADJ N .
DET N V TO V .
PRO VD DET ADJ N P DET N .
DET N V P DET ADJ N .
NP VD NP DET N .
DET N V VN DET N .
MOD PRO V DET N .
DET N V P DET ADJ N .
PRO MOD V DET N CNJ PRO MOD V .
DET N ADV VD DET N .
WH V DET ADJ N .
DET N V P DET N .
NUM N VD DET N .
DET ADJ N V VG P DET N .
PRO ADV VD P DET N .
DET N V P DET N .
PRO VD DET N CNJ PRO VD PRO .
DET N VD DET N DET N .
N CNJ N V N .";

/// Corpus de demonstração embutido (inglês, tagset simplificado do Brown).
pub fn demo_corpus() -> Vec<TrainingExample> {
    DEMO_SENTENCES
        .lines()
        .zip(DEMO_TAGS.lines())
        .map(|(sentence, tags)| TrainingExample::from_lines(sentence, tags))
        .collect()
}

/// Sentenças de demonstração (fora do corpus de treino) para a interface web.
pub fn demo_sentences() -> Vec<&'static str> {
    vec![
        "The cat saw the dog .",
        "She will read the book tomorrow .",
        "My friend walks to the park every day .",
        "The students watched the old movie .",
        "A bird sleeps in the tall tree .",
    ]
}
