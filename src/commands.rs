use std::path::PathBuf;

use log::debug;

use crate::{
    io::{
        parsers::{utils::get_base_extension, AlignmentFormat, GenomicFile},
        AlignmentOptions, AlignmentReader, FastaReader, FastqReader, GffReader, Reader,
        RecordDecoder,
    },
    prelude::*,
    reporting::{CommandOutput, Report},
};

/// What `htstream count` reports for a file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordCount {
    pub records: usize,
    /// Total sequence length (FASTA, FASTQ, and alignments).
    pub bases: u64,
}

/// Count the records in a file of any supported format.
///
/// The format is taken from `format` if given, otherwise inferred from the
/// file extension with [`GenomicFile::detect()`].
pub fn htstream_count(
    path: &PathBuf,
    format: Option<&str>,
    check_references: bool,
) -> Result<CommandOutput<RecordCount>, HtsError> {
    let file = match format {
        Some(format) => GenomicFile::from_format(format, path.clone())?,
        None => GenomicFile::detect(path)?,
    };
    debug!("counting records in {:?}", file);

    let mut report = Report::new();
    let count = match file {
        GenomicFile::Fasta(path) => count_sequences(FastaReader::from_path(path)?)?,
        GenomicFile::Fastq(path) => count_sequences(FastqReader::from_path(path)?)?,
        GenomicFile::Alignment(path) => {
            let labeled_bam = get_base_extension(&path).as_deref() == Some("bam");
            let options = AlignmentOptions::default().check_references(check_references);
            let reader = AlignmentReader::with_options(path, options)?;
            if !check_references && !reader.header().has_references() {
                report.add_issue("file declares no reference sequences".to_string());
            }
            if labeled_bam && reader.decoder().format() == Some(AlignmentFormat::Sam) {
                report.add_issue("file has a .bam extension but contains SAM text".to_string());
            }
            count_records(reader, |alignment: &Alignment| alignment.seq.len() as u64)?
        }
        GenomicFile::Gff(path) => count_records(GffReader::from_path(path)?, |_| 0)?,
    };
    Ok(CommandOutput::new(count, report))
}

fn count_sequences<D>(reader: Reader<'_, D>) -> Result<RecordCount, HtsError>
where
    D: RecordDecoder<Record = Entry<Sequence>>,
{
    count_records(reader, |entry: &Entry<Sequence>| match entry {
        Entry::Parsed(sequence) => sequence.len() as u64,
        Entry::Raw(_) => 0,
    })
}

/// Drain `reader` inside a scope, so it is closed even if a record fails
/// to decode.
fn count_records<D, F>(reader: Reader<'_, D>, bases: F) -> Result<RecordCount, HtsError>
where
    D: RecordDecoder,
    F: Fn(&D::Record) -> u64,
{
    reader.scoped(|reader| {
        let mut count = RecordCount::default();
        for record in reader {
            let record = record?;
            count.records += 1;
            count.bases += bases(&record);
        }
        Ok(count)
    })
}
