//! File adapters: FASTA drafts, BAM alignments, FASTA and feature TSV output.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use rust_htslib::bam::{self, record::Cigar, Read};
use tracing::{debug, warn};

use crate::estimator::{FeatureColumn, FEATURE_FIELDS, FEATURE_VERSION};
use crate::genomics::{CigarOp, CigarOpKind, DraftSequence, ReadAlignment, Strand};

/// Quality assigned when a BAM record carries no base qualities.
pub const DEFAULT_QUALITY: u8 = 30;

const FASTA_LINE_WIDTH: usize = 60;

/// Read every record of a FASTA file as a draft sequence.
pub fn read_fasta<P: AsRef<Path>>(path: P) -> Result<Vec<DraftSequence>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("failed to open FASTA {}", path.display()))?;
    parse_fasta(BufReader::new(file))
        .with_context(|| format!("failed to parse FASTA {}", path.display()))
}

/// Parse FASTA records from a reader.
pub fn parse_fasta<R: BufRead>(reader: R) -> Result<Vec<DraftSequence>> {
    let mut drafts = Vec::new();
    let mut name: Option<String> = None;
    let mut bases = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if let Some(header) = line.strip_prefix('>') {
            if let Some(prev) = name.take() {
                drafts.push(DraftSequence::new(prev, std::mem::take(&mut bases)));
            }
            let id = header.split_whitespace().next().unwrap_or("");
            if id.is_empty() {
                return Err(anyhow!("FASTA record without a name"));
            }
            name = Some(id.to_string());
        } else if !line.is_empty() {
            if name.is_none() {
                return Err(anyhow!("sequence data before the first FASTA header"));
            }
            bases.extend_from_slice(line.as_bytes());
        }
    }
    if let Some(prev) = name {
        drafts.push(DraftSequence::new(prev, bases));
    }
    Ok(drafts)
}

/// Load primary alignments for one contig from an indexed BAM file.
///
/// Unmapped, secondary, supplementary, QC-failed and duplicate records are
/// skipped; records whose CIGAR does not fit their sequence are logged and
/// dropped here rather than handed to the polisher.
pub fn load_bam_alignments<P: AsRef<Path>>(path: P, contig: &str) -> Result<Vec<ReadAlignment>> {
    let path = path.as_ref();
    let mut reader = bam::IndexedReader::from_path(path)
        .with_context(|| format!("failed to open indexed BAM {}", path.display()))?;
    let tid = reader
        .header()
        .tid(contig.as_bytes())
        .ok_or_else(|| anyhow!("contig {contig} not present in {}", path.display()))?;
    let contig_len = reader
        .header()
        .target_len(tid)
        .ok_or_else(|| anyhow!("contig {contig} has no length in {}", path.display()))?;
    reader
        .fetch((tid, 0u64, contig_len))
        .with_context(|| format!("failed to fetch {contig} from {}", path.display()))?;

    let mut reads = Vec::new();
    for result in reader.records() {
        let record = result.with_context(|| format!("failed to read record from {contig}"))?;
        if record.is_unmapped()
            || record.is_secondary()
            || record.is_supplementary()
            || record.is_quality_check_failed()
            || record.is_duplicate()
        {
            continue;
        }

        let id = String::from_utf8_lossy(record.qname()).into_owned();
        let cigar: Vec<CigarOp> = record.cigar().iter().filter_map(convert_cigar).collect();
        let sequence = record.seq().as_bytes();
        let qualities = match record.qual() {
            q if q.is_empty() || q[0] == 0xff => vec![DEFAULT_QUALITY; sequence.len()],
            q => q.to_vec(),
        };
        let strand = if record.is_reverse() {
            Strand::Reverse
        } else {
            Strand::Forward
        };

        match ReadAlignment::from_cigar(
            id.as_str(),
            strand,
            record.mapq(),
            record.pos() as u32,
            &cigar,
            &sequence,
            &qualities,
        ) {
            Ok(alignment) => reads.push(alignment),
            Err(err) => warn!(read = %id, error = %err, "dropping unusable BAM record"),
        }
    }

    debug!(contig, reads = reads.len(), "loaded alignments");
    Ok(reads)
}

fn convert_cigar(op: &Cigar) -> Option<CigarOp> {
    let (kind, len) = match *op {
        Cigar::Match(n) | Cigar::Equal(n) | Cigar::Diff(n) => (CigarOpKind::Match, n),
        Cigar::Ins(n) => (CigarOpKind::Insertion, n),
        Cigar::Del(n) | Cigar::RefSkip(n) => (CigarOpKind::Deletion, n),
        Cigar::SoftClip(n) => (CigarOpKind::SoftClip, n),
        Cigar::HardClip(n) => (CigarOpKind::HardClip, n),
        Cigar::Pad(_) => return None,
    };
    Some(CigarOp::new(kind, len))
}

/// Write one FASTA record with fixed-width lines.
pub fn write_fasta<W: Write>(writer: &mut W, name: &str, sequence: &[u8]) -> Result<()> {
    writeln!(writer, ">{name}")?;
    for line in sequence.chunks(FASTA_LINE_WIDTH) {
        writer.write_all(line)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the TSV header naming the feature contract.
pub fn write_feature_header<W: Write>(writer: &mut W) -> Result<()> {
    writeln!(writer, "#feature_version={FEATURE_VERSION}")?;
    write!(writer, "contig\tposition\tinsert_rank\tdraft_base")?;
    for field in FEATURE_FIELDS {
        write!(writer, "\t{field}")?;
    }
    writeln!(writer)?;
    Ok(())
}

/// Write feature columns of one contig as TSV rows.
pub fn write_features<W: Write>(
    writer: &mut W,
    contig: &str,
    columns: &[FeatureColumn],
) -> Result<()> {
    for column in columns {
        let rank = column
            .insert_rank
            .map_or_else(|| "-".to_string(), |rank| rank.to_string());
        let base = column.draft_base.map_or('-', char::from);
        write!(writer, "{contig}\t{}\t{rank}\t{base}", column.draft_pos)?;
        for value in column.values {
            write!(writer, "\t{value:.6}")?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Render feature columns into a TSV string (useful for tests and snapshots).
pub fn render_features(contig: &str, columns: &[FeatureColumn]) -> Result<String> {
    let mut buffer = Vec::new();
    write_feature_header(&mut buffer)?;
    write_features(&mut buffer, contig, columns)?;
    String::from_utf8(buffer).map_err(|_| anyhow!("rendered features are not valid UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::FEATURE_WIDTH;

    #[test]
    fn parse_fasta_reads_multiple_records() {
        let input = b">ctg1 description\nacgt\nAC\n\n>ctg2\nTTTT\n";
        let drafts = parse_fasta(&input[..]).unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].name().as_ref(), "ctg1");
        assert_eq!(drafts[0].bases(), b"ACGTAC");
        assert_eq!(drafts[1].bases(), b"TTTT");
    }

    #[test]
    fn parse_fasta_rejects_headerless_sequence() {
        assert!(parse_fasta(&b"ACGT\n"[..]).is_err());
    }

    #[test]
    fn fasta_lines_are_wrapped() {
        let mut out = Vec::new();
        write_fasta(&mut out, "ctg", &[b'A'; 130]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1].len(), 60);
        assert_eq!(lines[3].len(), 10);
    }

    #[test]
    fn rendered_features_carry_contract_header() {
        let columns = vec![FeatureColumn::uncovered(0, b'A')];
        let text = render_features("ctg", &columns).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("#feature_version=1"));
        let header = lines.next().unwrap();
        assert_eq!(header.split('\t').count(), 4 + FEATURE_WIDTH);
        assert!(lines.next().unwrap().starts_with("ctg\t0\t-\tA\t0.000000"));
    }
}
