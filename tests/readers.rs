//! Reading the files in `tests_data/` through every kind of source.

use htstream::io::parsers::{FastqDecoder, GffDecoder};
use htstream::prelude::*;
use htstream::records::TagCode;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

fn parsed_sequences<'a, D>(reader: Reader<'a, D>) -> Vec<Sequence>
where
    D: htstream::io::RecordDecoder<Record = Entry<Sequence>>,
{
    reader
        .map(|entry| entry.unwrap().parsed().unwrap())
        .collect()
}

fn alignments(reader: AlignmentReader) -> Vec<Alignment> {
    reader.map(|record| record.unwrap()).collect()
}

#[test]
fn test_fastq_sources_are_equivalent() {
    let from_str = parsed_sequences(FastqReader::from_source("tests_data/example.fastq").unwrap());
    let from_pathbuf =
        parsed_sequences(FastqReader::from_path(PathBuf::from("tests_data/example.fastq")).unwrap());
    let mut handle = File::open("tests_data/example.fastq").unwrap();
    let from_handle = parsed_sequences(FastqReader::from_source(&mut handle).unwrap());

    assert_eq!(from_str.len(), 3);
    assert_eq!(from_str, from_pathbuf);
    assert_eq!(from_str, from_handle);

    assert_eq!(from_str[0].name, "read1");
    assert_eq!(from_str[0].descr, "1:N:0:ATCACG");
    assert_eq!(from_str[0].len(), 60);
    assert_eq!(from_str[1].qual().unwrap()[9], 2);
    assert_eq!(from_str[2].qual_string().unwrap(), "!!III");
}

#[test]
fn test_fastq_gzip_matches_plain() {
    let plain = parsed_sequences(FastqReader::from_path("tests_data/example.fastq").unwrap());
    let gzipped = parsed_sequences(FastqReader::from_path("tests_data/example.fastq.gz").unwrap());
    assert_eq!(plain, gzipped);

    // gzip is sniffed from content, so a handle works the same way
    let mut handle = File::open("tests_data/example.fastq.gz").unwrap();
    let from_handle = parsed_sequences(FastqReader::from_source(&mut handle).unwrap());
    assert_eq!(plain, from_handle);
}

#[test]
fn test_raw_entries_reconstruct_decompressed_input() {
    let expected = std::fs::read_to_string("tests_data/example.fastq").unwrap();
    let options = FastqOptions::default().raw(true);
    let reader = FastqReader::with_options("tests_data/example.fastq.gz", options).unwrap();
    let raw: String = reader
        .map(|entry| entry.unwrap().raw().unwrap().to_string())
        .collect();
    assert_eq!(raw, expected);

    let expected = std::fs::read_to_string("tests_data/example.fa").unwrap();
    let options = FastaOptions::default().raw(true);
    let reader = FastaReader::with_options("tests_data/example.fa", options).unwrap();
    let entries: Vec<Entry<Sequence>> = reader.map(|entry| entry.unwrap()).collect();
    assert_eq!(entries.len(), 4);
    assert!(entries.iter().all(Entry::is_raw));
    let raw: String = entries.iter().filter_map(Entry::raw).collect();
    assert_eq!(raw, expected);
}

#[test]
fn test_fasta_records() {
    let records = parsed_sequences(FastaReader::from_path("tests_data/example.fa").unwrap());
    assert_eq!(records.len(), 4);
    assert_eq!(records[0].name, "chrI");
    assert_eq!(records[0].descr, "Saccharomyces cerevisiae chromosome I");
    assert_eq!(records[0].len(), 100);
    assert_eq!(records[1].seq_str().unwrap(), "TTCATAATTAATTTTTTATATATATA");
    assert_eq!(records[2].name, "empty");
    assert!(records[2].is_empty());
    assert_eq!(records[3].descr, "case sequence");
    assert_eq!(&records[3].seq[..], b"acgtnACGTN");
}

#[test]
fn test_sam_and_bam_decode_to_equal_records() {
    let sam = AlignmentReader::from_path("tests_data/example.sam").unwrap();
    let bam = AlignmentReader::from_path("tests_data/example.bam").unwrap();
    assert_eq!(sam.header(), bam.header());
    assert_eq!(bam.header().reference_len("chrII"), Some(813184));
    assert!(bam.header().text.contains("@RG\tID:grp1"));

    let sam = alignments(sam);
    let bam = alignments(bam);
    assert_eq!(sam.len(), 5);
    assert_eq!(sam, bam);
}

#[test]
fn test_bam_record_fields() {
    let records = alignments(BamReader::from_path("tests_data/example.bam").unwrap());

    let r001 = &records[0];
    assert_eq!(r001.read_name, "r001");
    assert!(r001.is_paired() && r001.is_proper_pair() && r001.is_first_in_pair());
    assert_eq!(r001.reference_name.as_deref(), Some("chrI"));
    assert_eq!(r001.position, Some(6));
    assert_eq!(r001.cigar_string(), "8M2I4M1D3M");
    assert_eq!(r001.reference_end(), Some(22));
    assert_eq!(r001.mate_reference_name.as_deref(), Some("chrI"));
    assert_eq!(r001.mate_position, Some(36));
    assert_eq!(r001.template_length, 39);
    assert_eq!(r001.qual, None);
    assert_eq!(r001.optional_field("NM"), Some(&TagValue::Integer(3)));
    assert!(!r001.has_inconsistent_mate());
    let tags: Vec<&TagCode> = r001.tags.iter().map(|(tag, _)| tag).collect();
    assert_eq!(tags, vec![&TagCode(*b"NM"), &TagCode(*b"RG")]);

    let r002 = &records[1];
    assert_eq!(r002.qual.as_deref(), Some(&[0u8; 14][..]));
    assert_eq!(r002.optional_field("XS").and_then(TagValue::as_integer), Some(-2));

    let r003 = &records[2];
    assert!(r003.is_supplementary() && r003.is_reverse());
    assert_eq!(r003.optional_field("XF").and_then(TagValue::as_float), Some(0.5));
    assert!(r003
        .require_optional_field("SA")
        .unwrap()
        .as_str()
        .unwrap()
        .starts_with("chrI,9"));

    let r004 = &records[3];
    assert_eq!(
        r004.optional_field("ZB"),
        Some(&TagValue::IntegerArray(vec![1, -2, 3]))
    );
    assert_eq!(r004.reference_len(), 25);

    let r005 = &records[4];
    assert!(r005.is_unmapped());
    assert_eq!(r005.reference_id, None);
    assert_eq!(r005.position, None);
    assert_eq!(&r005.seq[..], b"ACGTN");
    assert!(matches!(
        r005.require_optional_field("NM"),
        Err(HtsError::MissingTag(_))
    ));
}

#[test]
fn test_bam_without_reference_dictionary() {
    assert!(matches!(
        AlignmentReader::from_path("tests_data/no_sq.bam"),
        Err(HtsError::MissingReferenceDictionary)
    ));

    let options = AlignmentOptions::default().check_references(false);
    let reader = AlignmentReader::with_options("tests_data/no_sq.bam", options).unwrap();
    assert!(!reader.header().has_references());
    let records = alignments(reader);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].read_name, "m64011_190830_220126/1/ccs");
    assert_eq!(records[0].optional_field("np"), Some(&TagValue::Integer(12)));
    assert_eq!(records[1].qual.as_deref(), Some(&[93u8; 8][..]));
}

#[test]
fn test_inconsistent_mate_options() {
    let records = alignments(AlignmentReader::from_path("tests_data/inconsistent_mate.bam").unwrap());
    assert_eq!(records.len(), 1);
    assert!(records[0].has_inconsistent_mate());
    assert_eq!(records[0].mate_reference_id, None);
    assert_eq!(records[0].mate_position, Some(250));
    assert_eq!(records[0].optional_field("NM"), Some(&TagValue::Integer(0)));

    // options are independent: strict mates without reference checking
    let options = AlignmentOptions::default()
        .check_references(false)
        .strict_mates(true);
    let mut reader =
        AlignmentReader::with_options("tests_data/inconsistent_mate.bam", options).unwrap();
    assert!(matches!(reader.next(), Some(Err(HtsError::InconsistentMate(_)))));
    assert_eq!(reader.state(), ReaderState::Failed);
    assert!(reader.next().is_none());
}

#[test]
fn test_gff_features_and_metadata() {
    let mut reader = GffReader::from_path("tests_data/example.gff3.gz").unwrap();
    assert_eq!(reader.metadata()["gff-version"], vec!["3.1.26"]);
    assert_eq!(
        reader.metadata()["sequence-region"],
        vec!["ctg123 1 1497228"]
    );

    let features: Vec<GenomicFeature> = reader.by_ref().map(|f| f.unwrap()).collect();
    assert_eq!(features.len(), 8);
    assert!(features.iter().all(|f| f.start <= f.end));
    assert_eq!(features[0].id(), Some("gene00001"));
    assert_eq!(features[4].frame, Some(0));
    assert_eq!(features[4].parents(), vec!["mRNA00001"]);

    let last = &features[7];
    assert_eq!(last.source, "EST");
    assert_eq!(last.score, Some(93.7));
    assert_eq!(last.strand, Strand::Reverse);
    assert_eq!(last.attribute("Note"), Some("tRNA Gly; predicted"));

    assert_eq!(reader.state(), ReaderState::Exhausted);
}

#[test]
fn test_borrowed_handle_survives_reader() {
    let mut handle = File::open("tests_data/example.fa").unwrap();
    let count = FastaReader::from_source(&mut handle)
        .unwrap()
        .scoped(|reader| Ok(reader.count()))
        .unwrap();
    assert_eq!(count, 4);

    handle.seek(SeekFrom::Start(0)).unwrap();
    let mut first = [0u8; 5];
    handle.read_exact(&mut first).unwrap();
    assert_eq!(&first, b">chrI");
}

#[test]
fn test_scoped_reader_passes_result_through() {
    let result: Result<(), HtsError> = FastqReader::open_scoped(
        "tests_data/example.fastq",
        FastqDecoder::default(),
        |reader| {
            assert_eq!(reader.state(), ReaderState::Open);
            reader.next().transpose()?;
            Err(HtsError::MissingTag("XX".to_string()))
        },
    );
    assert!(matches!(result, Err(HtsError::MissingTag(tag)) if tag == "XX"));

    let names = FastqReader::open_scoped(
        "tests_data/example.fastq.gz",
        FastqDecoder::default(),
        |reader| {
            reader
                .map(|entry| entry.map(|e| e.parsed().map(|s| s.name).unwrap_or_default()))
                .collect::<Result<Vec<String>, HtsError>>()
        },
    )
    .unwrap();
    assert_eq!(names, vec!["read1", "read2", "read3"]);
}

#[test]
fn test_unreadable_sources() {
    assert!(matches!(
        FastaReader::from_path("tests_data"),
        Err(HtsError::NotReadable(_))
    ));
    assert!(matches!(
        Reader::open_scoped("tests_data", GffDecoder::new(), |_| Ok(())),
        Err(HtsError::NotReadable(_))
    ));
    assert!(matches!(
        FastaReader::from_path("tests_data/missing.fa"),
        Err(HtsError::IOError(_))
    ));
}

#[test]
fn test_read_after_close() {
    let mut reader = GffReader::from_path("tests_data/example.gff3.gz").unwrap();
    assert!(reader.next().unwrap().is_ok());
    reader.close();
    reader.close();
    assert!(matches!(reader.read_record(), Err(HtsError::ReaderClosed)));
    assert!(matches!(reader.next(), Some(Err(HtsError::ReaderClosed))));
}

#[test]
fn test_records_serde_round_trip() {
    let sequences = parsed_sequences(FastqReader::from_path("tests_data/example.fastq").unwrap());
    let json = serde_json::to_string(&sequences).unwrap();
    let back: Vec<Sequence> = serde_json::from_str(&json).unwrap();
    assert_eq!(sequences, back);

    let records = alignments(AlignmentReader::from_path("tests_data/example.bam").unwrap());
    let json = serde_json::to_string(&records).unwrap();
    assert!(json.contains("\"NM\""));
    let back: Vec<Alignment> = serde_json::from_str(&json).unwrap();
    assert_eq!(records, back);

    let features: Vec<GenomicFeature> = GffReader::from_path("tests_data/example.gff3.gz")
        .unwrap()
        .map(|f| f.unwrap())
        .collect();
    let json = serde_json::to_string(&features).unwrap();
    let back: Vec<GenomicFeature> = serde_json::from_str(&json).unwrap();
    assert_eq!(features, back);
}
