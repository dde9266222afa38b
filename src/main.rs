mod logging;

use clap::{Args, Parser, Subcommand, ValueEnum};
use logging::LogArgs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use textvec::{
    load_snapshot, load_snapshot_mmap, preprocess, read_directory, read_lines, read_lines_from,
    snapshot_exists, CorpusConfig, CountConfig, CsrMatrix, Dtype, Estimator, HashingConfig,
    ParallelExecutor, TokenizerConfig, VectorizeError, Vectorizer, DEFAULT_N_FEATURES,
    DEFAULT_TOKEN_PATTERN, DEFAULT_WINDOW_SIZE,
};

#[derive(Parser)]
#[command(name = "textvec")]
#[command(about = "Parallel text vectorization into sparse count matrices")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    logging: LogArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tokens of each document
    Tokenize {
        #[command(flatten)]
        tokenizer: TokenizerArgs,

        #[command(flatten)]
        input: InputArgs,

        /// Keep the original case
        #[arg(long)]
        no_lowercase: bool,

        /// Documents given on the command line (default: read input)
        text: Vec<String>,
    },

    /// Hash documents into a sparse matrix, no model needed
    Hash {
        #[command(flatten)]
        vectorizer: VectorizerArgs,

        #[command(flatten)]
        tokenizer: TokenizerArgs,

        #[command(flatten)]
        input: InputArgs,

        /// Only print the matrix shape
        #[arg(long)]
        summary: bool,
    },

    /// Fit a vectorizer and save it as a snapshot
    Fit {
        /// Which vectorizer to fit
        #[arg(short, long, value_enum, default_value_t = Kind::Count)]
        kind: Kind,

        #[command(flatten)]
        vectorizer: VectorizerArgs,

        #[command(flatten)]
        tokenizer: TokenizerArgs,

        #[command(flatten)]
        input: InputArgs,

        /// Output snapshot file path
        #[arg(short, long, default_value = "model.tvec")]
        output: PathBuf,
    },

    /// Encode documents with a saved snapshot
    Transform {
        /// Snapshot file path
        #[arg(short, long, default_value = "model.tvec")]
        model: PathBuf,

        #[command(flatten)]
        input: InputArgs,

        /// Use memory-mapped loading
        #[arg(long)]
        mmap: bool,

        /// Only print the matrix shape
        #[arg(long)]
        summary: bool,
    },

    /// Show snapshot statistics
    Stats {
        /// Snapshot file path
        #[arg(short, long, default_value = "model.tvec")]
        model: PathBuf,

        /// Also list the first N vocabulary terms
        #[arg(long, default_value_t = 0)]
        terms: usize,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Hashing,
    Count,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum TokenizerKind {
    Regexp,
    UnicodeWord,
    Character,
    LanguageAware,
}

/// Tokenizer selection arg group
#[derive(Args, Debug, Clone)]
struct TokenizerArgs {
    /// Tokenizer to split documents with
    #[arg(long, value_enum, default_value_t = TokenizerKind::Regexp)]
    tokenizer: TokenizerKind,

    /// Token regex for the regexp tokenizer
    #[arg(long, default_value = DEFAULT_TOKEN_PATTERN)]
    pattern: String,

    /// Window size for the character tokenizer
    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
    window_size: usize,

    /// Language code for the language-aware tokenizer
    #[arg(long, default_value = "en")]
    lang: String,

    /// Unicode tokenizer: drop punctuation segments
    #[arg(long)]
    no_word_bounds: bool,
}

impl TokenizerArgs {
    fn to_config(&self) -> TokenizerConfig {
        match self.tokenizer {
            TokenizerKind::Regexp => TokenizerConfig::Regexp {
                pattern: self.pattern.clone(),
            },
            TokenizerKind::UnicodeWord => TokenizerConfig::UnicodeWord {
                word_bounds: !self.no_word_bounds,
            },
            TokenizerKind::Character => TokenizerConfig::Character {
                window_size: self.window_size,
            },
            TokenizerKind::LanguageAware => TokenizerConfig::LanguageAware {
                lang: self.lang.clone(),
            },
        }
    }
}

/// Vectorizer option arg group
#[derive(Args, Debug, Clone)]
struct VectorizerArgs {
    /// Hashed feature space size
    #[arg(long, default_value_t = DEFAULT_N_FEATURES)]
    n_features: i64,

    /// Store 1 instead of counts
    #[arg(long)]
    binary: bool,

    /// Sign hashed counts with the hash sign bit
    #[arg(long)]
    alternate_sign: bool,

    /// Worker threads
    #[arg(short = 'j', long, default_value_t = 1, allow_negative_numbers = true)]
    n_jobs: i32,

    /// Output value type (int32, int64, float32, float64)
    #[arg(long)]
    dtype: Option<Dtype>,

    /// Keep the original case
    #[arg(long)]
    no_lowercase: bool,
}

impl VectorizerArgs {
    fn hashing_config(&self, tokenizer: TokenizerConfig) -> HashingConfig {
        let defaults = HashingConfig::default();
        HashingConfig {
            n_features: self.n_features,
            binary: self.binary,
            alternate_sign: self.alternate_sign,
            n_jobs: self.n_jobs,
            dtype: self.dtype.unwrap_or(defaults.dtype),
            lowercase: !self.no_lowercase,
            tokenizer,
            ..defaults
        }
    }

    fn count_config(&self, tokenizer: TokenizerConfig) -> CountConfig {
        let defaults = CountConfig::default();
        CountConfig {
            binary: self.binary,
            n_jobs: self.n_jobs,
            dtype: self.dtype.unwrap_or(defaults.dtype),
            lowercase: !self.no_lowercase,
            tokenizer,
            ..defaults
        }
    }
}

/// Document source arg group
#[derive(Args, Debug, Clone)]
struct InputArgs {
    /// Line-delimited documents, one per line ("-" for stdin)
    #[arg(short, long, conflicts_with = "dir")]
    input: Option<PathBuf>,

    /// Directory to read, one document per file
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Glob on file names to include (e.g. "*.txt")
    #[arg(long, requires = "dir")]
    include: Option<String>,

    /// Path components to exclude
    #[arg(short = 'x', long, value_delimiter = ',')]
    exclude: Option<Vec<String>>,

    /// Maximum file size in MB
    #[arg(long, default_value = "10")]
    max_size: u64,
}

/// Loaded documents and, for directory input, the file behind each row
struct Documents {
    texts: Vec<String>,
    sources: Option<Vec<PathBuf>>,
}

impl InputArgs {
    fn load(&self, n_jobs: i32) -> textvec::Result<Documents> {
        if let Some(dir) = &self.dir {
            let mut config = CorpusConfig {
                include: self.include.clone(),
                max_file_size: self.max_size * 1024 * 1024,
                ..Default::default()
            };
            if let Some(excl) = &self.exclude {
                config.exclude_patterns = excl.clone();
            }
            let executor = ParallelExecutor::new(n_jobs)?;
            let (sources, texts) = read_directory(dir, &config, &executor)?
                .into_iter()
                .map(|f| (f.path, f.text))
                .unzip();
            return Ok(Documents {
                texts,
                sources: Some(sources),
            });
        }

        let texts = match &self.input {
            Some(path) if path != Path::new("-") => read_lines(path)?,
            _ => read_lines_from(std::io::stdin().lock())?,
        };
        Ok(Documents {
            texts,
            sources: None,
        })
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.logging.setup_logging(2) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Tokenize {
            tokenizer,
            input,
            no_lowercase,
            text,
        } => cmd_tokenize(tokenizer, input, !no_lowercase, text),

        Commands::Hash {
            vectorizer,
            tokenizer,
            input,
            summary,
        } => cmd_hash(vectorizer, tokenizer, input, summary),

        Commands::Fit {
            kind,
            vectorizer,
            tokenizer,
            input,
            output,
        } => cmd_fit(kind, vectorizer, tokenizer, input, output),

        Commands::Transform {
            model,
            input,
            mmap,
            summary,
        } => cmd_transform(model, input, mmap, summary),

        Commands::Stats { model, terms } => cmd_stats(model, terms),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_tokenize(
    tokenizer: TokenizerArgs,
    input: InputArgs,
    lowercase: bool,
    text: Vec<String>,
) -> textvec::Result<()> {
    let tokenizer = tokenizer.to_config().build()?;
    let documents = if text.is_empty() {
        input.load(1)?.texts
    } else {
        text
    };

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for document in &documents {
        let document = preprocess(document, lowercase);
        let tokens: Vec<&str> = tokenizer.tokenize(&document).collect();
        writeln!(out, "{:?}", tokens)?;
    }
    out.flush()?;

    Ok(())
}

fn cmd_hash(
    vectorizer: VectorizerArgs,
    tokenizer: TokenizerArgs,
    input: InputArgs,
    summary: bool,
) -> textvec::Result<()> {
    let config = vectorizer.hashing_config(tokenizer.to_config());
    let estimator = Estimator::hashing(config)?;
    let documents = input.load(vectorizer.n_jobs)?;

    let start = Instant::now();
    let matrix = estimator.transform(&documents.texts)?;
    log::info!(
        "hashed {} documents in {:.3}s",
        documents.texts.len(),
        start.elapsed().as_secs_f64()
    );

    print_matrix(&matrix, documents.sources.as_deref(), summary)
}

fn cmd_fit(
    kind: Kind,
    vectorizer: VectorizerArgs,
    tokenizer: TokenizerArgs,
    input: InputArgs,
    output: PathBuf,
) -> textvec::Result<()> {
    let tokenizer = tokenizer.to_config();
    let mut estimator = match kind {
        Kind::Hashing => Estimator::hashing(vectorizer.hashing_config(tokenizer))?,
        Kind::Count => Estimator::count(vectorizer.count_config(tokenizer))?,
    };
    let documents = input.load(vectorizer.n_jobs)?.texts;

    let start = Instant::now();
    estimator.fit(&documents)?;
    let fit_time = start.elapsed();

    println!(
        "Fitted {} vectorizer on {} documents ({} features) in {:.2}s",
        estimator.kind(),
        documents.len(),
        estimator.n_features().unwrap_or(0),
        fit_time.as_secs_f64()
    );

    estimator.save(&output)?;
    let file_size = std::fs::metadata(&output).map(|m| m.len()).unwrap_or(0);
    println!(
        "Saved snapshot to {} ({:.2} KB)",
        output.display(),
        file_size as f64 / 1024.0
    );

    Ok(())
}

fn load_estimator(path: &Path, use_mmap: bool) -> textvec::Result<Estimator> {
    if !snapshot_exists(path) {
        return Err(VectorizeError::SnapshotNotFound(path.display().to_string()));
    }
    let snapshot = if use_mmap {
        load_snapshot_mmap(path)?
    } else {
        load_snapshot(path)?
    };
    Estimator::from_snapshot(snapshot)
}

fn cmd_transform(
    model: PathBuf,
    input: InputArgs,
    use_mmap: bool,
    summary: bool,
) -> textvec::Result<()> {
    let start = Instant::now();
    let estimator = load_estimator(&model, use_mmap)?;
    let load_time = start.elapsed();

    let n_jobs = match &estimator {
        Estimator::Hashing(v) => v.config().n_jobs,
        Estimator::Count(v) => v.config().n_jobs,
    };
    let documents = input.load(n_jobs)?;

    let start = Instant::now();
    let matrix = estimator.transform(&documents.texts)?;
    log::info!(
        "transformed {} documents in {:.3}s (load: {:.3}s)",
        documents.texts.len(),
        start.elapsed().as_secs_f64(),
        load_time.as_secs_f64()
    );

    print_matrix(&matrix, documents.sources.as_deref(), summary)
}

fn cmd_stats(model: PathBuf, terms: usize) -> textvec::Result<()> {
    if !snapshot_exists(&model) {
        return Err(VectorizeError::SnapshotNotFound(
            model.display().to_string(),
        ));
    }

    let snapshot = load_snapshot(&model)?;
    let version = snapshot.version;
    let estimator = Estimator::from_snapshot(snapshot)?;

    let file_size = std::fs::metadata(&model).map(|m| m.len()).unwrap_or(0);

    println!("Snapshot Statistics");
    println!("===================");
    println!("Version:       {}", version);
    println!("Vectorizer:    {}", estimator.kind());
    println!("Fitted:        {}", estimator.is_fitted());
    match estimator.n_features() {
        Some(n) => println!("Features:      {}", n),
        None => println!("Features:      -"),
    }
    println!("Snapshot size: {:.2} KB", file_size as f64 / 1024.0);
    println!();

    for (key, value) in estimator.get_params().iter() {
        println!("{:<24} {}", key, value);
    }

    if terms > 0 {
        if let Estimator::Count(v) = &estimator {
            if let Some(vocabulary) = v.vocabulary() {
                println!();
                for (term, column) in vocabulary.iter().take(terms) {
                    println!("{:>8}  {}", column, term);
                }
            }
        }
    }

    Ok(())
}

fn print_matrix(
    matrix: &CsrMatrix,
    sources: Option<&[PathBuf]>,
    summary: bool,
) -> textvec::Result<()> {
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    write_matrix(&mut out, matrix, sources, summary)?;
    out.flush()?;

    Ok(())
}

/// Shape line, then `# row path` lines when rows come from files, then
/// one `row column value` line per stored value
fn write_matrix<W: Write>(
    out: &mut W,
    matrix: &CsrMatrix,
    sources: Option<&[PathBuf]>,
    summary: bool,
) -> std::io::Result<()> {
    writeln!(
        out,
        "# shape {} x {}, nnz {}, dtype {}",
        matrix.n_rows(),
        matrix.n_features(),
        matrix.nnz(),
        matrix.dtype()
    )?;

    if let Some(sources) = sources {
        for (row, path) in sources.iter().enumerate() {
            writeln!(out, "# {}\t{}", row, path.display())?;
        }
    }

    if !summary {
        for row in 0..matrix.n_rows() {
            for (column, value) in matrix.row(row) {
                writeln!(out, "{}\t{}\t{}", row, column, value)?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use textvec::CountVectorizer;

    fn render(matrix: &CsrMatrix, sources: Option<&[PathBuf]>, summary: bool) -> String {
        let mut out = Vec::new();
        write_matrix(&mut out, matrix, sources, summary).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_rows_are_traced_to_files() {
        let mut v = CountVectorizer::new(CountConfig::default()).unwrap();
        let matrix = v.fit_transform(&["cat sat", "dog"]).unwrap();
        let sources = vec![PathBuf::from("docs/01.txt"), PathBuf::from("docs/02.txt")];

        let text = render(&matrix, Some(&sources), false);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "# 0\tdocs/01.txt");
        assert_eq!(lines[2], "# 1\tdocs/02.txt");
        assert_eq!(&lines[3..], &["0\t0\t1", "0\t1\t1", "1\t2\t1"]);
    }

    #[test]
    fn test_line_input_has_no_path_header() {
        let mut v = CountVectorizer::new(CountConfig::default()).unwrap();
        let matrix = v.fit_transform(&["cat sat"]).unwrap();

        let text = render(&matrix, None, false);
        assert_eq!(text.lines().count(), 3);
        assert!(text.starts_with("# shape 1 x 2"));

        let text = render(&matrix, None, true);
        assert_eq!(text.lines().count(), 1);
    }
}
