//! 索引构建的总流程：读入 FASTA，编码，分部分排序后缀，并写出全部索引文件。

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::WriteBytesExt;

use crate::alphabet::codes::recommended_prefix_length;
use crate::alphabet::{Alphabet, UNDEFBWTCHAR};
use crate::encseq::esq::ESQ_SUFFIX;
use crate::encseq::EncodedSequence;
use crate::error::{ConfigError, IoContext, Result};
use crate::index::lcp::{lcp_table_linear, LcpCalculator, LcpStats, LcpWriter};
use crate::index::options::SuffixeratorOptions;
use crate::index::suffixer::Suffixerator;
use crate::io::fasta::FastaReader;
use crate::io::prj::{DbFile, ProjectInfo, PRJ_SUFFIX};
use crate::io::tables::{create_writer, index_file, write_usize, AL1_SUFFIX, BCK_SUFFIX, BWT_SUFFIX, LCP_SUFFIX, LLV_SUFFIX, SUF_SUFFIX};
use crate::util::timer::PhaseTimer;

/// 按配置选出字母表：自定义符号映射优先，其次蛋白质，默认 DNA
pub fn select_alphabet(opts: &SuffixeratorOptions) -> Result<Alphabet> {
    match &opts.smap {
        Some(path) => Alphabet::from_file(path),
        None if opts.protein => Ok(Alphabet::protein()),
        None => Ok(Alphabet::dna()),
    }
}

/// 读入全部输入文件，编码为一个以分隔符连接的文本
pub fn read_inputs(inputs: &[PathBuf], alphabet: &Alphabet) -> Result<(Vec<u8>, Vec<DbFile>)> {
    let mut seqs: Vec<Vec<u8>> = Vec::new();
    let mut dbfiles = Vec::with_capacity(inputs.len());
    for path in inputs {
        let mut reader = FastaReader::from_path(path)?;
        let mut effectivelength = 0u64;
        while let Some(record) = reader.next_record()? {
            effectivelength += record.seq.len() as u64;
            seqs.push(record.seq);
        }
        if effectivelength == 0 {
            return Err(ConfigError::Other(format!("{} contains no sequence data", path.display())).into());
        }
        log::debug!("{}: {} bytes, {} symbols", path.display(), reader.bytes_read(), effectivelength);
        dbfiles.push(DbFile {
            name: path.display().to_string(),
            length: reader.bytes_read(),
            effectivelength,
        });
    }
    let text = alphabet.encode_multiseq(seqs.iter().map(Vec::as_slice))?;
    Ok((text, dbfiles))
}

/// 从 FASTA 文件构建索引
pub fn run_suffixerator(inputs: &[PathBuf], opts: &SuffixeratorOptions) -> Result<ProjectInfo> {
    opts.validate()?;
    let mut timer = PhaseTimer::start("reading input sequences");
    let alphabet = select_alphabet(opts)?;
    let (text, dbfiles) = read_inputs(inputs, &alphabet)?;
    timer.next_phase("encoding sequence");
    let encseq = match opts.accesstype {
        Some(accesstype) => EncodedSequence::with_access_type(&text, alphabet.num_of_chars(), accesstype)?,
        None => EncodedSequence::encode(&text, alphabet.num_of_chars())?,
    };
    drop(text);
    let prj = write_index(&encseq, &alphabet, dbfiles, opts, &mut timer)?;
    timer.finish();
    Ok(prj)
}

#[derive(Default)]
struct TableWriters {
    suf: Option<BufWriter<File>>,
    lcp: Option<LcpWriter<BufWriter<File>>>,
    bwt: Option<BufWriter<File>>,
}

impl TableWriters {
    fn open(opts: &SuffixeratorOptions) -> Result<Self> {
        let name = opts.indexname.as_str();
        let mut writers = Self::default();
        if opts.outputs.suf {
            writers.suf = Some(create_writer(&index_file(name, SUF_SUFFIX))?);
        }
        if opts.outputs.lcp {
            writers.lcp = Some(LcpWriter::new(
                create_writer(&index_file(name, LCP_SUFFIX))?,
                create_writer(&index_file(name, LLV_SUFFIX))?,
            ));
        }
        if opts.outputs.bwt {
            writers.bwt = Some(create_writer(&index_file(name, BWT_SUFFIX))?);
        }
        Ok(writers)
    }
}

fn write_failed(indexname: &str) -> impl FnOnce() -> String + '_ {
    move || format!("cannot write index tables for {}", indexname)
}

/// 对已编码的序列排序后缀并写出 `opts.outputs` 选定的索引文件
pub fn write_index(
    encseq: &EncodedSequence,
    alphabet: &Alphabet,
    dbfiles: Vec<DbFile>,
    opts: &SuffixeratorOptions,
    timer: &mut PhaseTimer,
) -> Result<ProjectInfo> {
    let readmode = opts.readmode;
    encseq.check_readmode(readmode)?;
    let name = opts.indexname.as_str();
    let totallength = encseq.total_length();

    if opts.outputs.esq {
        encseq.write_file(index_file(name, ESQ_SUFFIX))?;
    }
    if opts.outputs.al1 {
        let path = index_file(name, AL1_SUFFIX);
        let mut out = create_writer(&path)?;
        alphabet
            .write_to(&mut out)
            .and_then(|_| out.flush())
            .io_context(|| format!("cannot write {}", path.display()))?;
    }

    let prefixlength = opts
        .prefixlength
        .unwrap_or_else(|| recommended_prefix_length(encseq.num_of_chars(), totallength));
    timer.next_phase("counting prefix codes");
    let mut sfi = Suffixerator::new(encseq, readmode, prefixlength, opts.numofparts, opts.strategy)?;

    timer.next_phase("sorting suffixes");
    let mut writers = TableWriters::open(opts)?;
    let mut lcpcalc = LcpCalculator::new(encseq, readmode);
    // 单个部分时整张后缀表本来就放得下，lcp 改在最后用 Kasai 线性计算
    let mut fullsuftab = (opts.numofparts == 1 && writers.lcp.is_some()).then(|| Vec::with_capacity(totallength + 1));
    let mut longest = None;
    let mut nextindex = 0usize;
    while let Some(part) = sfi.next_part() {
        for &suffix in part {
            if suffix == 0 {
                longest = Some(nextindex);
            }
            if let Some(out) = writers.suf.as_mut() {
                write_usize(out, suffix).io_context(write_failed(name))?;
            }
            if let Some(suftab) = fullsuftab.as_mut() {
                suftab.push(suffix);
            } else if let Some(out) = writers.lcp.as_mut() {
                out.push(lcpcalc.next_lcp(suffix)).io_context(write_failed(name))?;
            }
            if let Some(out) = writers.bwt.as_mut() {
                let cc = if suffix == 0 { UNDEFBWTCHAR } else { encseq.get(suffix - 1, readmode) };
                out.write_u8(cc).io_context(write_failed(name))?;
            }
            nextindex += 1;
        }
    }
    debug_assert_eq!(nextindex, totallength + 1);
    if let (Some(suftab), Some(out)) = (fullsuftab.take(), writers.lcp.as_mut()) {
        timer.next_phase("computing lcp values");
        for value in lcp_table_linear(encseq, readmode, &suftab) {
            out.push(value).io_context(write_failed(name))?;
        }
    }

    timer.next_phase("writing index files");
    if let Some(mut out) = writers.suf.take() {
        out.flush().io_context(write_failed(name))?;
    }
    if let Some(mut out) = writers.bwt.take() {
        out.flush().io_context(write_failed(name))?;
    }
    let lcpstats: Option<LcpStats> = match writers.lcp.take() {
        Some(out) => Some(out.finish().io_context(write_failed(name))?),
        None => None,
    };
    if opts.outputs.bck {
        let path = index_file(name, BCK_SUFFIX);
        let mut out = create_writer(&path)?;
        sfi.bucket_table()
            .write_to(&mut out)
            .and_then(|_| out.flush())
            .io_context(|| format!("cannot write {}", path.display()))?;
    }

    let mut prj = ProjectInfo::new(totallength, encseq.special_char_info(), encseq.num_of_sequences(), readmode);
    prj.longest = longest;
    prj.prefixlength = prefixlength;
    prj.largelcpvalues = lcpstats.map(|s| s.largelcpvalues);
    prj.maxbranchdepth = lcpstats.map(|s| s.maxbranchdepth);
    prj.dbfiles = dbfiles;
    prj.write_file(index_file(name, PRJ_SUFFIX))?;
    log::info!(
        "index {}: {} symbols, {} sequences, prefix length {}",
        name,
        totallength,
        prj.numofsequences,
        prefixlength
    );
    Ok(prj)
}

/// 删除一个索引的全部文件（不存在的文件忽略）
pub fn remove_index(indexname: &str) -> Result<()> {
    for suffix in [PRJ_SUFFIX, ESQ_SUFFIX, AL1_SUFFIX, SUF_SUFFIX, LCP_SUFFIX, LLV_SUFFIX, BWT_SUFFIX, BCK_SUFFIX] {
        let path = index_file(indexname, suffix);
        if Path::new(&path).exists() {
            std::fs::remove_file(&path).io_context(|| format!("cannot remove {}", path.display()))?;
        }
    }
    Ok(())
}
