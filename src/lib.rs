//! # gbfeat
//!
//! `gbfeat` ingests the feature table of a GenBank/EMBL-style flat-file
//! record and turns it into a validated, structured feature list together
//! with one canonical organism descriptor for the sequence.
//!
//! The input is the record's feature table already cut into raw blocks
//! ([`RawFeatureBlock`]), one per feature, each tagged with its position in
//! the record. The output is an [`AssembledRecord`] holding the surviving
//! features in their original order, the validated gaps, every source
//! feature with its own descriptor, and the record-level
//! [`OrganismDescriptor`]. Every finding along the way is reported as a
//! [`Diagnostic`] with one of five severities; a `Reject` discards the
//! record and a `Fatal` finding aborts a batch.
//!
//! ## Key Features
//!
//! * **Qualifier tokenizing**: quoted values wrapped over several lines,
//!   `""` escapes, stray quotes inside free text, merging of `/note`s.
//! * **Source features**: organism names with genome keywords, modifier
//!   based disambiguation keys, `/PCR_primers` and `/collection_date`
//!   grammars, coverage of the sequence by source features, and the choice of
//!   the one feature that describes the record.
//! * **Gaps**: `gap` and AGP 2.0 `assembly_gap` features, their lengths,
//!   types and linkage evidence, and HTG phase expectations.
//! * **Feature rules**: legacy regulatory keys, `/evidence` conversion,
//!   `/pseudo` and `/pseudogene`, duplicate removal, rRNA and tRNA product
//!   names, operons and locus tags.
//! * **Parallel batches**: independent records run on a rayon pool whose
//!   size is read from the `GBFEAT_NUM_THREADS` environment variable.
//!
//! Location parsing, the qualifier grammar and taxonomy lookups sit behind
//! small traits ([`LocationResolver`], [`QualifierGrammar`],
//! [`TaxonomyService`]) with bundled defaults; findings go to a
//! [`DiagnosticSink`], by default the `log` facade.
//!
//! ## Structure
//!
//! * [`data_structs`]: blocks, qualifiers, features, source and gap records,
//!   descriptors and coordinates.
//! * [`tokenizer`]: qualifier text to typed qualifiers.
//! * [`source`]: source feature collection, coverage and consolidation.
//! * [`gap`]: gap feature validation.
//! * [`assembly`]: the per-record pipeline and the feature-level rules.
//! * [`collaborators`]: location, grammar and taxonomy services.
//! * [`diagnostics`]: findings, severities and sinks.
//! * [`config`]: run configuration and record metadata.
//!
//! ## Usage
//!
//! ```no_run
//! use gbfeat::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let blocks = vec![
//!         RawFeatureBlock::parse(
//!             0,
//!             "source          1..5000\n/organism=\"Homo sapiens\"\n/mol_type=\"genomic DNA\"",
//!         )?,
//!         RawFeatureBlock::parse(1, "gene            100..900\n/gene=\"abc\"")?,
//!     ];
//!     let meta = RecordMeta::new("AB000001", 5000);
//!
//!     let assembler = FeatureAssembler::new(AssemblerConfig::default());
//!     let outcome = assembler.assemble(&meta, &blocks)?;
//!     match outcome.record {
//!         Some(record) => println!("{}: {}", record.accession, record.descriptor),
//!         None => println!("{} rejected", outcome.accession),
//!     }
//!     Ok(())
//! }
//! ```

pub mod assembly;
pub mod collaborators;
pub mod config;
pub mod data_structs;
pub mod diagnostics;
pub mod exports;
pub mod gap;
pub mod prelude;
pub mod source;
pub mod tokenizer;
pub mod utils;

#[allow(unused_imports)]
use prelude::*;
