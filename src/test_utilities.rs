//! Test cases and test utility functions.
//!

use flate2::{write::GzEncoder, Compression};
use rand::{thread_rng, Rng};
use std::io::Write;
use tempfile::{Builder, NamedTempFile};

use crate::records::CigarKind;

// Random FASTQ defaults
pub const MIN_READ_LEN: usize = 50;
pub const MAX_READ_LEN: usize = 300;

const NUCLEOTIDES: &[u8; 4] = b"ACGT";

/// Write `contents` to a new temporary file.
pub fn temp_file_with(contents: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("could not create temporary file");
    file.write_all(contents)
        .expect("could not write temporary file");
    file.flush().expect("could not flush temporary file");
    file
}

/// Gzip-compress `contents` as a single gzip member.
pub fn gzip_bytes(contents: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(contents)
        .expect("could not gzip test data");
    encoder.finish().expect("could not gzip test data")
}

/// Build a random nucleotide sequence.
pub fn random_sequence(len: usize) -> Vec<u8> {
    let mut rng = thread_rng();
    (0..len)
        .map(|_| NUCLEOTIDES[rng.gen_range(0..NUCLEOTIDES.len())])
        .collect()
}

/// Build the text of a random FASTQ file with `n` reads.
pub fn random_fastq(n: usize) -> String {
    let mut rng = thread_rng();
    let mut fastq = String::new();
    for i in 0..n {
        let len = rng.gen_range(MIN_READ_LEN..=MAX_READ_LEN);
        let seq = random_sequence(len);
        let qual: String = (0..len).map(|_| rng.gen_range(b'!'..=b'J') as char).collect();
        fastq.push_str(&format!(
            "@read{} random\n{}\n+\n{}\n",
            i,
            String::from_utf8_lossy(&seq),
            qual
        ));
    }
    fastq
}

/// Write a random FASTQ file with `n` reads, gzip-compressed if `gzip`.
pub fn random_fastq_file(n: usize, gzip: bool) -> NamedTempFile {
    let fastq = random_fastq(n);
    let suffix = if gzip { ".fastq.gz" } else { ".fastq" };
    let mut file = Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("could not create temporary file");
    let contents = if gzip {
        gzip_bytes(fastq.as_bytes())
    } else {
        fastq.into_bytes()
    };
    file.write_all(&contents)
        .expect("could not write temporary file");
    file.flush().expect("could not flush temporary file");
    file
}

/// Builds the (uncompressed) bytes of a BAM file.
#[derive(Debug, Default)]
pub struct BamBuilder {
    text: String,
    references: Vec<(String, u32)>,
    blocks: Vec<Vec<u8>>,
}

impl BamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn reference(mut self, name: &str, length: u32) -> Self {
        self.references.push((name.to_string(), length));
        self
    }

    pub fn record(self, record: BamRecordBuilder) -> Self {
        self.raw_block(record.encode())
    }

    /// Append a record block as-is; its length prefix is added on build.
    pub fn raw_block(mut self, block: Vec<u8>) -> Self {
        self.blocks.push(block);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bytes = b"BAM\x01".to_vec();
        bytes.extend((self.text.len() as i32).to_le_bytes());
        bytes.extend(self.text.as_bytes());
        bytes.extend((self.references.len() as i32).to_le_bytes());
        for (name, length) in &self.references {
            bytes.extend((name.len() as i32 + 1).to_le_bytes());
            bytes.extend(name.as_bytes());
            bytes.push(0);
            bytes.extend(length.to_le_bytes());
        }
        for block in &self.blocks {
            bytes.extend((block.len() as i32).to_le_bytes());
            bytes.extend(block);
        }
        bytes
    }
}

/// Builds one BAM record block (without its length prefix).
#[derive(Debug)]
pub struct BamRecordBuilder {
    name: String,
    ref_id: i32,
    pos: i32,
    mapq: u8,
    flags: u16,
    cigar: Vec<u32>,
    seq: Vec<u8>,
    qual: Option<Vec<u8>>,
    mate_ref_id: i32,
    mate_pos: i32,
    template_length: i32,
    tags: Vec<u8>,
}

impl BamRecordBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ref_id: -1,
            pos: -1,
            mapq: 0,
            flags: 0,
            cigar: Vec::new(),
            seq: Vec::new(),
            qual: None,
            mate_ref_id: -1,
            mate_pos: -1,
            template_length: 0,
            tags: Vec::new(),
        }
    }

    pub fn unmapped(mut self) -> Self {
        self.flags |= 0x4;
        self.ref_id = -1;
        self.pos = -1;
        self
    }

    pub fn reference(mut self, ref_id: i32, pos: i32) -> Self {
        self.ref_id = ref_id;
        self.pos = pos;
        self
    }

    pub fn flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    pub fn mapq(mut self, mapq: u8) -> Self {
        self.mapq = mapq;
        self
    }

    pub fn cigar(mut self, ops: &[(CigarKind, u32)]) -> Self {
        self.cigar = ops
            .iter()
            .map(|&(kind, len)| len << 4 | kind as u32)
            .collect();
        self
    }

    pub fn seq(mut self, seq: &[u8]) -> Self {
        self.seq = seq.to_vec();
        self
    }

    pub fn qual(mut self, qual: &[u8]) -> Self {
        self.qual = Some(qual.to_vec());
        self
    }

    pub fn mate(mut self, ref_id: i32, pos: i32) -> Self {
        self.mate_ref_id = ref_id;
        self.mate_pos = pos;
        self
    }

    pub fn template_length(mut self, template_length: i32) -> Self {
        self.template_length = template_length;
        self
    }

    pub fn tag_int(mut self, tag: [u8; 2], value: i64) -> Self {
        self.tags.extend(tag);
        self.tags.push(b'i');
        self.tags.extend((value as i32).to_le_bytes());
        self
    }

    pub fn tag_string(mut self, tag: [u8; 2], value: &str) -> Self {
        self.tags.extend(tag);
        self.tags.push(b'Z');
        self.tags.extend(value.as_bytes());
        self.tags.push(0);
        self
    }

    pub fn tag_u32_array(mut self, tag: [u8; 2], values: &[u32]) -> Self {
        self.tags.extend(tag);
        self.tags.extend(b"BI");
        self.tags.extend((values.len() as u32).to_le_bytes());
        for value in values {
            self.tags.extend(value.to_le_bytes());
        }
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut block = Vec::new();
        block.extend(self.ref_id.to_le_bytes());
        block.extend(self.pos.to_le_bytes());
        block.push(self.name.len() as u8 + 1);
        block.push(self.mapq);
        block.extend(0u16.to_le_bytes());
        block.extend((self.cigar.len() as u16).to_le_bytes());
        block.extend(self.flags.to_le_bytes());
        block.extend((self.seq.len() as u32).to_le_bytes());
        block.extend(self.mate_ref_id.to_le_bytes());
        block.extend(self.mate_pos.to_le_bytes());
        block.extend(self.template_length.to_le_bytes());
        block.extend(self.name.as_bytes());
        block.push(0);
        for op in &self.cigar {
            block.extend(op.to_le_bytes());
        }
        for pair in self.seq.chunks(2) {
            let high = encode_base(pair[0]);
            let low = pair.get(1).map_or(0, |&base| encode_base(base));
            block.push(high << 4 | low);
        }
        match &self.qual {
            Some(qual) => block.extend(qual),
            None => block.extend(std::iter::repeat(0xff).take(self.seq.len())),
        }
        block.extend(&self.tags);
        block
    }
}

fn encode_base(base: u8) -> u8 {
    b"=ACMGRSVTWYHKDBN"
        .iter()
        .position(|&b| b == base.to_ascii_uppercase())
        .unwrap_or(15) as u8
}
