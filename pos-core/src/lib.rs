//! # pos-core: Etiquetador Morfossintático (POS) com HMM
//!
//! Este crate estima um Hidden Markov Model de primeira ordem a partir de
//! texto anotado e usa o algoritmo de Viterbi para atribuir a sequência de
//! tags mais provável a sentenças novas.
//!
//! ## Arquitetura do Sistema
//!
//! Dois componentes, treinados e depois consultados:
//!
//! 1.  **Treino** ([`hmm`]): conta emissões (tag → palavra) e transições
//!     (tag → tag) e converte as contagens em log-probabilidades.
//! 2.  **Decodificação** ([`viterbi`]): programação dinâmica sobre as duas
//!     tabelas, com backpointers para reconstruir o melhor caminho.
//!
//! Ao redor do núcleo ficam a leitura de corpus ([`corpus`]), a contagem de
//! acertos ([`evaluation`]) e a fachada [`PosTagger`] ([`tagger`]).
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use pos_core::{corpus::TrainingExample, PosTagger, TaggerConfig};
//!
//! // 1. Corpus anotado: uma sentença por exemplo, palavras e tags alinhadas
//! let corpus = vec![
//!     TrainingExample::from_lines("The dog barks .", "DET N V ."),
//!     TrainingExample::from_lines("A cat sleeps .", "DET N V ."),
//! ];
//!
//! // 2. Treina o modelo (penalidade padrão de -100 para palavras não vistas)
//! let tagger = PosTagger::train(&corpus, &TaggerConfig::default()).unwrap();
//!
//! // 3. Etiqueta uma sentença nova
//! let tagged = tagger.tag("The cat barks .").unwrap();
//! assert_eq!(PosTagger::render(&tagged), "the/det cat/n barks/v ./.");
//! ```
//!
//! ## Módulos Principais
//!
//! - [`hmm`]: Treino e tabelas de emissão/transição.
//! - [`viterbi`]: Decodificação e rastreamento passo a passo.
//! - [`tagset`]: Internação de tags e palavras em índices.
//! - [`config`]: Penalidade de palavras não vistas e sentinela de início.

pub mod config;
pub mod corpus;
pub mod error;
pub mod evaluation;
pub mod hmm;
pub mod tagger;
pub mod tagset;
pub mod viterbi;

pub use config::TaggerConfig;
pub use error::{PosError, Result};
pub use evaluation::Evaluation;
pub use hmm::HmmModel;
pub use tagger::{PosTagger, TaggedWord};
