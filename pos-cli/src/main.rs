//! Linha de comando do etiquetador: avaliação em arquivo, teste interativo no
//! console e etiquetagem de linhas vindas da entrada padrão.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use pos_core::corpus::{demo_corpus, load_parallel_files};
use pos_core::evaluation::evaluate;
use pos_core::tagger::tokenize_sentence;
use pos_core::{Evaluation, PosTagger, TaggerConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pos", version, about = "Etiquetador POS com HMM de primeira ordem e Viterbi")]
struct Cli {
    #[command(flatten)]
    training: TrainingArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct TrainingArgs {
    /// Arquivo de sentenças de treino, uma por linha (padrão: corpus de demonstração embutido)
    #[arg(long, global = true)]
    train_sentences: Option<PathBuf>,

    /// Arquivo de tags de treino, alinhado linha a linha com as sentenças
    #[arg(long, global = true)]
    train_tags: Option<PathBuf>,

    /// Configuração em JSON ({"unseen_penalty": -100.0, "start_tag": "#"})
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Sobrescreve a penalidade de emissão para palavras não vistas
    #[arg(long, global = true, allow_negative_numbers = true)]
    unseen_penalty: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Etiqueta um par de arquivos de teste e conta acertos e erros
    Evaluate {
        #[arg(long)]
        test_sentences: PathBuf,
        #[arg(long)]
        test_tags: PathBuf,
    },
    /// Teste interativo: digite uma sentença e depois as tags esperadas ('q' sai)
    Console,
    /// Etiqueta cada linha da entrada padrão no formato palavra/tag
    Tag,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let tagger = build_tagger(&cli.training)?;

    match cli.command {
        Command::Evaluate { test_sentences, test_tags } => {
            let examples = load_parallel_files(&test_sentences, &test_tags).with_context(|| {
                format!("lendo {} e {}", test_sentences.display(), test_tags.display())
            })?;
            let evaluation = evaluate(&tagger, &examples)?;
            println!("Teste em arquivo:");
            println!("Sentenças: {}", test_sentences.display());
            println!("Tags: {}", test_tags.display());
            println!("{}", evaluation);
        }
        Command::Console => {
            let stdin = io::stdin();
            let evaluation = run_console(&tagger, stdin.lock(), io::stdout())?;
            println!("{}", evaluation);
        }
        Command::Tag => {
            let stdin = io::stdin();
            run_tag(&tagger, stdin.lock(), io::stdout())?;
        }
    }

    Ok(())
}

fn build_tagger(args: &TrainingArgs) -> Result<PosTagger> {
    let mut config = match &args.config {
        Some(path) => TaggerConfig::from_json_file(path)
            .with_context(|| format!("lendo configuração {}", path.display()))?,
        None => TaggerConfig::default(),
    };
    if let Some(penalty) = args.unseen_penalty {
        config = config.with_unseen_penalty(penalty);
    }

    let corpus = match (&args.train_sentences, &args.train_tags) {
        (Some(sentences), Some(tags)) => load_parallel_files(sentences, tags)
            .with_context(|| format!("lendo corpus {} / {}", sentences.display(), tags.display()))?,
        (None, None) => demo_corpus(),
        _ => bail!("--train-sentences e --train-tags precisam ser usados juntos"),
    };

    let tagger = PosTagger::train(&corpus, &config)?;
    let summary = tagger.summary();
    info!(
        sentences = corpus.len(),
        tags = summary.tags.len(),
        vocabulary = summary.vocabulary_size,
        unseen_penalty = summary.unseen_penalty,
        "modelo treinado"
    );
    Ok(tagger)
}

/// Laço do teste no console. Retorna o acumulado de todas as sentenças avaliadas.
fn run_console<R: BufRead, W: Write>(tagger: &PosTagger, mut input: R, mut out: W) -> Result<Evaluation> {
    let mut overall = Evaluation::new();
    let mut line = String::new();

    loop {
        writeln!(out, "Escreva uma sentença de teste, ou 'q' para sair:")?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let sentence = line.trim().to_string();
        if sentence.eq_ignore_ascii_case("q") {
            break;
        }
        if sentence.is_empty() {
            continue;
        }

        let tagged = match tagger.tag(&sentence) {
            Ok(tagged) => tagged,
            Err(e) => {
                writeln!(out, "Não foi possível etiquetar: {}", e)?;
                continue;
            }
        };
        writeln!(out, "Linha gerada pelo Viterbi: {}", PosTagger::render(&tagged))?;

        writeln!(out, "Digite a tag esperada de cada palavra (vazio para pular):")?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let gold = tokenize_sentence(&line);
        if gold.is_empty() {
            continue;
        }

        let mut evaluation = Evaluation::new();
        if let Err(e) = evaluation.record_sentence(0, &tagged, &gold) {
            writeln!(out, "Linha de tags inválida: {}", e)?;
            continue;
        }
        writeln!(out, "{}", evaluation)?;
        overall.merge(&evaluation);
    }

    Ok(overall)
}

/// Etiqueta cada linha não vazia da entrada. Linhas sem caminho viável são
/// reportadas no log e saem em branco, para manter o alinhamento.
fn run_tag<R: BufRead, W: Write>(tagger: &PosTagger, input: R, mut out: W) -> Result<()> {
    for (i, line) in input.lines().enumerate() {
        let line = line?;
        match tagger.tag(&line) {
            Ok(tagged) => writeln!(out, "{}", PosTagger::render(&tagged))?,
            Err(e) => {
                tracing::warn!(line = i + 1, error = %e, "linha não etiquetada");
                writeln!(out)?;
            }
        }
    }
    Ok(())
}
