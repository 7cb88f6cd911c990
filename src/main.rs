use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use esa_rust::alphabet::Alphabet;
use esa_rust::encseq::{AccessType, EncodedSequence, Readmode};
use esa_rust::esa::limdfs::esa_limited_dfs;
use esa_rust::esa::maxpairs::enumerate_maxpairs;
use esa_rust::esa::mmsearch::{query_substring_matches, MMSearchIterator};
use esa_rust::esa::myers::myers_online;
use esa_rust::esa::reader::{SequentialSuffixArrayReader, Suffixarray, TableDemand};
use esa_rust::index::options::SuffixeratorOptions;
use esa_rust::index::run::run_suffixerator;
use esa_rust::io::fasta::FastaReader;
use esa_rust::io::prj::{ProjectInfo, PRJ_SUFFIX};
use esa_rust::io::tables::index_file;
use esa_rust::util::dna;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "esa-rust", author, version, about = "Enhanced suffix arrays for genome sequences", arg_required_else_help = true)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build an enhanced suffix array from FASTA files
    Index(IndexArgs),
    /// Show the project information of an index
    Stat {
        indexname: String,
        /// Print JSON instead of key=value lines
        #[arg(long)]
        json: bool,
    },
    /// Exact search of patterns, or maximal matches of query sequences
    Search {
        indexname: String,
        /// Patterns given as sequences
        patterns: Vec<String>,
        /// Also search the reverse complement of every pattern (DNA only)
        #[arg(long)]
        revcomp: bool,
        /// FASTA file of query sequences; reports maximal exact matches
        #[arg(short, long, conflicts_with = "patterns")]
        query: Option<PathBuf>,
        /// Minimal length of maximal exact matches
        #[arg(short = 'l', long, default_value_t = 20)]
        minlength: usize,
    },
    /// Approximate search by limited depth first traversal of the index
    Approx {
        indexname: String,
        pattern: String,
        /// Maximal edit distance
        #[arg(short = 'k', long, default_value_t = 1)]
        maxdistance: usize,
        /// Matches must not contain wildcards
        #[arg(long)]
        nowildcards: bool,
    },
    /// Approximate search by scanning the encoded sequence
    Online {
        indexname: String,
        pattern: String,
        #[arg(short = 'k', long, default_value_t = 1)]
        maxdistance: usize,
    },
    /// Enumerate maximal repeated pairs
    Maxpairs {
        indexname: String,
        /// Minimal length of a reported pair
        #[arg(short = 'l', long, default_value_t = 20)]
        length: usize,
    },
}

#[derive(Args, Debug)]
struct IndexArgs {
    /// Input FASTA files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Base name of the index files
    #[arg(short, long)]
    indexname: Option<String>,
    /// JSON file with construction options; flags override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Prefix length of the bucket codes (default: derived from the sequence length)
    #[arg(short, long)]
    prefixlength: Option<u32>,
    /// Number of parts the suffix array is built in
    #[arg(long)]
    parts: Option<u32>,
    /// fwd, rev, cpl or rcl
    #[arg(long)]
    readmode: Option<Readmode>,
    /// direct, bit, uchar, ushort, uint32 or uint64
    #[arg(long)]
    accesstype: Option<AccessType>,
    #[arg(long)]
    protein: bool,
    /// Symbol map file defining the alphabet
    #[arg(long)]
    smap: Option<String>,
    /// Also write the bucket table
    #[arg(long)]
    bck: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new().filter_level(level).parse_default_env().init();

    match cli.command {
        Commands::Index(args) => run_index(args),
        Commands::Stat { indexname, json } => run_stat(&indexname, json),
        Commands::Search {
            indexname,
            patterns,
            revcomp,
            query,
            minlength,
        } => match query {
            Some(query) => run_query_matches(&indexname, &query, minlength),
            None => run_search(&indexname, &patterns, revcomp),
        },
        Commands::Approx {
            indexname,
            pattern,
            maxdistance,
            nowildcards,
        } => run_approx(&indexname, &pattern, maxdistance, nowildcards),
        Commands::Online {
            indexname,
            pattern,
            maxdistance,
        } => run_online(&indexname, &pattern, maxdistance),
        Commands::Maxpairs { indexname, length } => run_maxpairs(&indexname, length),
    }
}

fn run_index(args: IndexArgs) -> Result<()> {
    let mut opts = match &args.config {
        Some(path) => SuffixeratorOptions::from_json_file(path)?,
        None => SuffixeratorOptions::default(),
    };
    if let Some(indexname) = args.indexname {
        opts.indexname = indexname;
    }
    if args.prefixlength.is_some() {
        opts.prefixlength = args.prefixlength;
    }
    if let Some(parts) = args.parts {
        opts.numofparts = parts;
    }
    if let Some(readmode) = args.readmode {
        opts.readmode = readmode;
    }
    if args.accesstype.is_some() {
        opts.accesstype = args.accesstype;
    }
    if args.protein {
        opts.protein = true;
    }
    if args.smap.is_some() {
        opts.smap = args.smap;
    }
    if args.bck {
        opts.outputs.bck = true;
    }

    let prj = run_suffixerator(&args.inputs, &opts)?;
    println!("index: {}", opts.indexname);
    println!("sequences: {}", prj.numofsequences);
    println!("totallength: {}", prj.totallength);
    println!("prefixlength: {}", prj.prefixlength);
    Ok(())
}

fn run_stat(indexname: &str, json: bool) -> Result<()> {
    let prj = ProjectInfo::read_file(index_file(indexname, PRJ_SUFFIX))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&prj)?);
    } else {
        print!("{}", prj.to_prj_string());
    }
    Ok(())
}

fn index_alphabet(sa: &Suffixarray, indexname: &str) -> Result<Alphabet> {
    sa.alphabet
        .clone()
        .ok_or_else(|| anyhow!("index '{}' has no alphabet file", indexname))
}

fn encode_pattern(alphabet: &Alphabet, pattern: &str) -> Result<Vec<u8>> {
    alphabet
        .encode_seq(pattern.as_bytes())
        .with_context(|| format!("cannot encode pattern '{}'", pattern))
}

/// 正向读取时给出序列编号与序列内偏移
fn locate(encseq: &EncodedSequence, readmode: Readmode, pos: usize) -> String {
    if readmode.is_reverse() {
        return pos.to_string();
    }
    let seqnum = encseq.seqnum_of(pos);
    format!("{}\t{}\t{}", pos, seqnum, pos - encseq.seq_start(seqnum))
}

fn run_search(indexname: &str, patterns: &[String], revcomp: bool) -> Result<()> {
    if patterns.is_empty() {
        bail!("no pattern given");
    }
    let sa = Suffixarray::map(indexname, TableDemand::SUFTAB)?;
    let alphabet = index_alphabet(&sa, indexname)?;
    if revcomp && !alphabet.is_dna() {
        bail!("--revcomp requires a DNA index");
    }
    let suftab = sa.suftab.as_ref().ok_or_else(|| anyhow!("index '{}' has no suffix table", indexname))?;
    let readmode = sa.readmode();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    for pattern in patterns {
        let mut queries = vec![(pattern.clone(), '+')];
        if revcomp {
            queries.push((String::from_utf8_lossy(&dna::revcomp(pattern.as_bytes())).into_owned(), '-'));
        }
        for (query, strand) in queries {
            let codes = encode_pattern(&alphabet, &query)?;
            let it = MMSearchIterator::over_all(&sa.encseq, suftab, readmode, &codes);
            writeln!(out, "# {} {} {} occurrences", query, strand, it.num_of_matches())?;
            let mut positions: Vec<usize> = it.collect();
            positions.sort_unstable();
            for pos in positions {
                writeln!(out, "{}\t{}", strand, locate(&sa.encseq, readmode, pos))?;
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn run_query_matches(indexname: &str, query: &Path, minlength: usize) -> Result<()> {
    let sa = Suffixarray::map(indexname, TableDemand::SUFTAB)?;
    let alphabet = index_alphabet(&sa, indexname)?;
    let suftab = sa.suftab.as_ref().ok_or_else(|| anyhow!("index '{}' has no suffix table", indexname))?;
    let readmode = sa.readmode();
    let mut seqs = Vec::new();
    for record in FastaReader::from_path(query)? {
        seqs.push(record?.seq);
    }
    if seqs.is_empty() {
        bail!("query file '{}' contains no sequences", query.display());
    }
    let codes = alphabet.encode_multiseq(seqs.iter().map(Vec::as_slice))?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    query_substring_matches(&sa.encseq, suftab, readmode, &codes, minlength, |m| {
        writeln!(out, "{}\t{}\t{}\t{}", m.length, locate(&sa.encseq, readmode, m.dbstart), m.querynum, m.querystart)
            .map_err(|e| esa_rust::error::EsaError::io("cannot write matches", e))
    })?;
    out.flush()?;
    Ok(())
}

fn run_approx(indexname: &str, pattern: &str, maxdistance: usize, nowildcards: bool) -> Result<()> {
    let sa = Suffixarray::map(indexname, TableDemand::SUFTAB)?;
    let alphabet = index_alphabet(&sa, indexname)?;
    let suftab = sa.suftab.as_ref().ok_or_else(|| anyhow!("index '{}' has no suffix table", indexname))?;
    let readmode = sa.readmode();
    let codes = encode_pattern(&alphabet, pattern)?;

    let mut matches = Vec::new();
    esa_limited_dfs(&sa.encseq, suftab, readmode, &codes, maxdistance, nowildcards, |dbstart, len| {
        matches.push((dbstart, len));
        Ok(())
    })?;
    matches.sort_unstable();
    println!("# {} {} matches with at most {} differences", pattern, matches.len(), maxdistance);
    for (dbstart, len) in matches {
        let matched = sa.encseq.extract(dbstart..dbstart + len, readmode);
        println!("{}\t{}\t{}", locate(&sa.encseq, readmode, dbstart), len, alphabet.decode_seq(&matched));
    }
    Ok(())
}

fn run_online(indexname: &str, pattern: &str, maxdistance: usize) -> Result<()> {
    let sa = Suffixarray::map(indexname, TableDemand::default())?;
    let alphabet = index_alphabet(&sa, indexname)?;
    let readmode = sa.readmode();
    let codes = encode_pattern(&alphabet, pattern)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    myers_online(&sa.encseq, readmode, &codes, maxdistance, |m| {
        writeln!(out, "{}\t{}\t{}", locate(&sa.encseq, readmode, m.startpos), m.endpos - m.startpos + 1, m.distance)
            .map_err(|e| esa_rust::error::EsaError::io("cannot write matches", e))
    })?;
    out.flush()?;
    Ok(())
}

fn run_maxpairs(indexname: &str, length: usize) -> Result<()> {
    let mut ssar = SequentialSuffixArrayReader::from_file(indexname)?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut count = 0usize;
    enumerate_maxpairs(&mut ssar, length, |len, pos1, pos2| {
        count += 1;
        writeln!(out, "{}\t{}\t{}", len, pos1.min(pos2), pos1.max(pos2)).map_err(|e| esa_rust::error::EsaError::io("cannot write pairs", e))
    })?;
    out.flush()?;
    log::info!("{} maximal pairs of length at least {}", count, length);
    Ok(())
}
