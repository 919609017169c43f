//! # Algoritmo de Viterbi: Decodificação de Sequências HMM
//!
//! Parte do sentinela de início e avança palavra a palavra mantendo uma
//! **fronteira** com as tags alcançadas e o melhor score acumulado de cada uma.
//!
//! ## Intuição
//!
//! A **melhor sequência até a palavra i terminando na tag t** depende apenas da
//! **melhor sequência até a palavra i-1** terminando em alguma tag anterior.
//! Em vez de testar `T^N` sequências, basta guardar, a cada passo, o melhor
//! score de cada tag e de onde ele veio (o *backpointer*).
//!
//! ## Algoritmo
//!
//! ```text
//! Inicialização: fronteira = { # }, score[#] = 0
//!
//! Recursão: para cada tag `pos` da fronteira e cada `next` observada após `pos`:
//!     cand = score[pos] + ln P(next | pos) + ln P(palavra_i | next)   (ou penalidade)
//!     guarda cand se for o primeiro candidato de `next` ou estritamente maior
//!
//! Terminação: melhor score da última fronteira
//! Backtracking: segue os backpointers de trás pra frente
//! ```
//!
//! ## Poda pela esparsidade
//!
//! Só são expandidas as transições que existem na tabela: uma tag nunca vista
//! depois de `pos` no treino é **inalcançável** a partir de `pos`. Se a
//! fronteira esvaziar, a decodificação falha com
//! [`PosError::ExhaustedFrontier`]; não há resultado parcial.
//!
//! ## Desempate
//!
//! A fronteira e as transições são percorridas em ordem crescente de
//! [`TagId`] (a ordem em que as tags apareceram no treino). Em empates vence o
//! primeiro candidato visto, tanto no backpointer quanto na tag final.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{PosError, Result};
use crate::hmm::HmmModel;
use crate::tagger::TaggedWord;
use crate::tagset::TagId;

/// Uma camada da decodificação: as tags alcançadas em uma palavra
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViterbiStep {
    /// Índice da palavra sendo processada
    pub token_index: usize,
    /// Palavra (já normalizada) deste passo
    pub word: String,
    /// Se a palavra existe no vocabulário de treino
    pub known_word: bool,
    /// Tags alcançadas neste passo, em ordem de id
    pub scores: Vec<TagScore>,
    /// Primeira tag de maior score da camada
    pub best_tag: String,
    /// Score acumulado de `best_tag`
    pub best_score: f64,
}

/// Célula de uma tag alcançada, com o backpointer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagScore {
    pub tag: String,
    /// Soma de transições e emissões desde o sentinela
    pub score: f64,
    /// Tag anterior que gerou este score ótimo (backpointer)
    pub best_prev: String,
    /// Score de emissão neste passo (ou a penalidade de palavra não vista)
    pub emission: f64,
    /// ln P(tag | best_prev)
    pub transition: f64,
}

/// Saída de [`decode_with_trace`]: caminho escolhido mais as camadas
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViterbiResult {
    /// Palavras com a tag escolhida e o score acumulado em cada posição
    pub tagged: Vec<TaggedWord>,
    /// log-prob do melhor caminho completo
    pub best_score: f64,
    /// Tabela de scores por passo
    pub steps: Vec<ViterbiStep>,
}

/// Melhor candidato de uma tag em um passo.
#[derive(Debug, Clone, Copy)]
struct Cell {
    score: f64,
    prev: TagId,
    transition: f64,
    emission: f64,
}

/// Camadas de backpointers produzidas pela passagem para frente.
///
/// `layers[i][t]` é `Some` exatamente para as tags alcançadas na palavra `i`.
/// Vive só durante uma chamada de decodificação.
struct Lattice {
    words: Vec<String>,
    known: Vec<bool>,
    layers: Vec<Vec<Option<Cell>>>,
}

/// Decodifica uma sentença e retorna `(palavra, tag, score acumulado)` por posição.
///
/// As palavras são normalizadas para minúsculas. Uma sentença vazia retorna
/// uma sequência vazia.
///
/// ```rust
/// use pos_core::{config::TaggerConfig, corpus::TrainingExample, hmm::HmmModel, viterbi};
///
/// let corpus = vec![TrainingExample::from_lines("dog", "noun")];
/// let model = HmmModel::train(&corpus, &TaggerConfig::default()).unwrap();
///
/// let tagged = viterbi::decode(&model, &["cat"]).unwrap();
/// assert_eq!(tagged[0].tag, "noun");
/// assert_eq!(tagged[0].score, -100.0);
/// ```
pub fn decode<S: AsRef<str>>(model: &HmmModel, words: &[S]) -> Result<Vec<TaggedWord>> {
    let lattice = forward(model, words)?;
    backtrack(model, &lattice)
}

/// Como [`decode`], mas também devolve a tabela de scores de cada passo.
pub fn decode_with_trace<S: AsRef<str>>(model: &HmmModel, words: &[S]) -> Result<ViterbiResult> {
    let lattice = forward(model, words)?;
    let tagged = backtrack(model, &lattice)?;
    let best_score = tagged.last().map(|t| t.score).unwrap_or(0.0);
    let steps = trace_steps(model, &lattice);

    Ok(ViterbiResult {
        tagged,
        best_score,
        steps,
    })
}

/// Passagem para frente: constrói as camadas de backpointers.
fn forward<S: AsRef<str>>(model: &HmmModel, words: &[S]) -> Result<Lattice> {
    let n_tags = model.tags().len();
    let penalty = model.unseen_penalty();
    let words: Vec<String> = words.iter().map(|w| w.as_ref().to_lowercase()).collect();

    let mut layers: Vec<Vec<Option<Cell>>> = Vec::with_capacity(words.len());
    let mut known = Vec::with_capacity(words.len());
    // Fronteira: (tag, score acumulado), sempre em ordem crescente de id
    let mut frontier: Vec<(TagId, f64)> = vec![(TagId::START, 0.0)];

    for (position, word) in words.iter().enumerate() {
        let word_id = model.vocabulary().get(word);
        known.push(word_id.is_some());
        let mut layer: Vec<Option<Cell>> = vec![None; n_tags];

        for &(pos, score) in &frontier {
            for &(next, transition) in model.transitions().followers(pos) {
                let emission = word_id
                    .and_then(|w| model.emissions().log_prob(next, w))
                    .unwrap_or(penalty);
                let candidate = score + transition + emission;

                // Primeiro candidato ou estritamente melhor; empates mantêm o primeiro
                let improves = match layer[next.index()] {
                    Some(cell) => candidate > cell.score,
                    None => true,
                };
                if improves {
                    layer[next.index()] = Some(Cell {
                        score: candidate,
                        prev: pos,
                        transition,
                        emission,
                    });
                }
            }
        }

        frontier = model
            .tags()
            .iter()
            .zip(&layer)
            .filter_map(|((tag, _), cell)| cell.map(|c| (tag, c.score)))
            .collect();

        trace!(position, word = %word, reached = frontier.len(), "passo do Viterbi");

        if frontier.is_empty() {
            return Err(PosError::ExhaustedFrontier { position });
        }
        layers.push(layer);
    }

    Ok(Lattice {
        words,
        known,
        layers,
    })
}

/// Retorna a primeira tag de maior score de uma camada (empates: menor id).
fn best_in_layer(model: &HmmModel, layer: &[Option<Cell>]) -> Option<(TagId, f64)> {
    let mut best: Option<(TagId, f64)> = None;
    for ((tag, _), cell) in model.tags().iter().zip(layer) {
        if let Some(cell) = cell {
            if best.map_or(true, |(_, score)| cell.score > score) {
                best = Some((tag, cell.score));
            }
        }
    }
    best
}

/// Reconstrução do caminho ótimo seguindo os backpointers de trás pra frente.
fn backtrack(model: &HmmModel, lattice: &Lattice) -> Result<Vec<TaggedWord>> {
    let Some(last_layer) = lattice.layers.last() else {
        return Ok(Vec::new());
    };
    let n = lattice.layers.len();
    let (mut current, _) = best_in_layer(model, last_layer)
        .ok_or(PosError::ExhaustedFrontier { position: n - 1 })?;

    let mut path: Vec<(TagId, f64)> = Vec::with_capacity(n);
    for (position, layer) in lattice.layers.iter().enumerate().rev() {
        // Toda tag do caminho foi alcançada no seu passo, por construção
        let cell = layer[current.index()].ok_or(PosError::ExhaustedFrontier { position })?;
        path.push((current, cell.score));
        current = cell.prev;
    }
    path.reverse();

    Ok(lattice
        .words
        .iter()
        .zip(path)
        .map(|(word, (tag, score))| TaggedWord {
            word: word.clone(),
            tag: model.tags().label(tag).to_string(),
            score,
        })
        .collect())
}

fn trace_steps(model: &HmmModel, lattice: &Lattice) -> Vec<ViterbiStep> {
    let tags = model.tags();
    lattice
        .layers
        .iter()
        .enumerate()
        .map(|(i, layer)| {
            let scores = tags
                .iter()
                .zip(layer)
                .filter_map(|((_, label), cell)| {
                    cell.map(|c| TagScore {
                        tag: label.to_string(),
                        score: c.score,
                        best_prev: tags.label(c.prev).to_string(),
                        emission: c.emission,
                        transition: c.transition,
                    })
                })
                .collect();
            let (best_tag, best_score) = best_in_layer(model, layer)
                .map(|(tag, score)| (tags.label(tag).to_string(), score))
                .unwrap_or_default();

            ViterbiStep {
                token_index: i,
                word: lattice.words[i].clone(),
                known_word: lattice.known[i],
                scores,
                best_tag,
                best_score,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaggerConfig;
    use crate::corpus::{demo_corpus, TrainingExample};

    fn train(pairs: &[(&str, &str)]) -> HmmModel {
        let corpus: Vec<TrainingExample> = pairs
            .iter()
            .map(|(s, t)| TrainingExample::from_lines(s, t))
            .collect();
        HmmModel::train(&corpus, &TaggerConfig::default()).unwrap()
    }

    fn tags_of(tagged: &[TaggedWord]) -> Vec<&str> {
        tagged.iter().map(|t| t.tag.as_str()).collect()
    }

    #[test]
    fn test_single_word_sentence() {
        let model = train(&[("dog", "noun")]);
        let tagged = decode(&model, &["dog"]).unwrap();
        assert_eq!(tagged, vec![TaggedWord { word: "dog".into(), tag: "noun".into(), score: 0.0 }]);
    }

    #[test]
    fn test_unseen_word_penalty() {
        let model = train(&[("dog", "noun")]);
        let tagged = decode(&model, &["cat"]).unwrap();
        assert_eq!(tagged[0].tag, "noun");
        assert_eq!(tagged[0].score, -100.0);

        // A penalidade é configurável
        let model = model.with_unseen_penalty(-7.5).unwrap();
        let tagged = decode(&model, &["cat"]).unwrap();
        assert_eq!(tagged[0].score, -7.5);
    }

    #[test]
    fn test_input_is_lowercased() {
        let model = train(&[("dog", "noun")]);
        let tagged = decode(&model, &["DOG"]).unwrap();
        assert_eq!(tagged[0].word, "dog");
        assert_eq!(tagged[0].score, 0.0);
    }

    #[test]
    fn test_empty_sentence() {
        let model = train(&[("dog", "noun")]);
        let empty: [&str; 0] = [];
        assert!(decode(&model, &empty).unwrap().is_empty());
        let result = decode_with_trace(&model, &empty).unwrap();
        assert!(result.steps.is_empty());
        assert_eq!(result.best_score, 0.0);
    }

    #[test]
    fn test_unreachable_start_fails() {
        let model = HmmModel::train(&[], &TaggerConfig::default()).unwrap();
        let err = decode(&model, &["dog"]).unwrap_err();
        assert!(matches!(err, PosError::ExhaustedFrontier { position: 0 }));
    }

    #[test]
    fn test_frontier_exhausted_mid_sentence() {
        // "n" só aparece no fim de sentença: não tem sucessores
        let model = train(&[("the end", "det n")]);
        let err = decode(&model, &["the", "end", "again"]).unwrap_err();
        assert!(matches!(err, PosError::ExhaustedFrontier { position: 2 }));
    }

    #[test]
    fn test_missing_transitions_prune_tags() {
        // "run" só foi visto como "v", mas det -> v nunca ocorreu
        let model = train(&[("the dog", "det n"), ("run", "v")]);
        let tagged = decode(&model, &["the", "run"]).unwrap();
        assert_eq!(tags_of(&tagged), vec!["det", "n"]);
        assert!((tagged[1].score - (0.5f64.ln() + 0.0 + -100.0)).abs() < 1e-12);
    }

    #[test]
    fn test_ties_keep_first_seen_predecessor() {
        // p e q são indistinguíveis: mesmo score em todos os passos
        let model = train(&[("a x", "p z"), ("a x", "q z")]);
        let first = decode(&model, &["a", "x"]).unwrap();
        assert_eq!(tags_of(&first), vec!["p", "z"]);
        let again = decode(&model, &["a", "x"]).unwrap();
        assert_eq!(first, again);

        // A ordem de aparição no treino decide o empate
        let model = train(&[("a x", "q z"), ("a x", "p z")]);
        assert_eq!(tags_of(&decode(&model, &["a", "x"]).unwrap()), vec!["q", "z"]);
        assert_eq!(tags_of(&decode(&model, &["a"]).unwrap()), vec!["q"]);
    }

    #[test]
    fn test_demo_sentence_is_tagged() {
        let model = HmmModel::train(&demo_corpus(), &TaggerConfig::default()).unwrap();
        let tagged = decode(&model, &["The", "dog", "saw", "the", "cat", "."]).unwrap();
        assert_eq!(tags_of(&tagged), vec!["det", "n", "vd", "det", "n", "."]);
    }

    #[test]
    fn test_backpointers_reproduce_path_and_scores() {
        let model = HmmModel::train(&demo_corpus(), &TaggerConfig::default()).unwrap();
        let words = ["my", "friend", "walks", "to", "the", "park", "every", "day", "."];
        let result = decode_with_trace(&model, &words).unwrap();

        assert_eq!(result.tagged.len(), words.len());
        assert_eq!(result.steps.len(), words.len());
        assert!(!result.steps[1].known_word); // "friend" não está no corpus

        // Re-caminha os backpointers a partir da tag final
        let mut tag = result.tagged.last().unwrap().tag.clone();
        let mut walked = Vec::new();
        for step in result.steps.iter().rev() {
            let cell = step.scores.iter().find(|s| s.tag == tag).unwrap();
            walked.push(cell.clone());
            tag = cell.best_prev.clone();
        }
        walked.reverse();
        assert_eq!(tag, "#");

        let mut previous = 0.0;
        for (tagged, cell) in result.tagged.iter().zip(&walked) {
            assert_eq!(tagged.tag, cell.tag);
            assert_eq!(tagged.score, cell.score);
            assert!((cell.score - (previous + cell.transition + cell.emission)).abs() < 1e-9);
            previous = cell.score;
        }
        assert_eq!(result.best_score, previous);
    }

    #[test]
    fn test_final_tag_is_best_of_last_step() {
        let model = HmmModel::train(&demo_corpus(), &TaggerConfig::default()).unwrap();
        let result = decode_with_trace(&model, &["the", "old", "cat"]).unwrap();
        let last = result.steps.last().unwrap();
        assert_eq!(result.tagged[2].tag, last.best_tag);
        assert!(last.scores.iter().all(|s| s.score <= last.best_score));
    }

    #[test]
    fn test_model_is_shared_read_only() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HmmModel>();

        let model = HmmModel::train(&demo_corpus(), &TaggerConfig::default()).unwrap();
        let expected = decode(&model, &["she", "likes", "the", "dog"]).unwrap();
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| decode(&model, &["she", "likes", "the", "dog"]).unwrap()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }
}
