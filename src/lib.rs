//! Formdoc converts a structured form submission (an entry) together with its form
//! schema into a single, deterministically ordered, hierarchical data document that is
//! ready to be handed to an external PDF layout engine. The crate covers everything in
//! between: resolving each field through a polymorphic, extensible handler registry
//! with a guaranteed fallback, recursively merging the heterogeneous per-field
//! fragments without key collisions, re-keying coded choice values into their display
//! labels, and enforcing a fixed top-level key order so downstream templates always
//! see a stable, predictable section sequence.
//!
//! The actual PDF byte-stream generation is deliberately not part of this crate: the
//! assembled document is an in-memory structured value that an external rendering
//! stage maps onto template placeholders. The same goes for the statistics backend
//! that powers the survey, quiz and poll sections, which is injected behind the
//! `ResultsProvider` trait and treated as a fail-soft collaborator.

/// The module where the form schema is defined.
///
/// The entry point is the `Form` struct: an immutable, ordered sequence of `Field`
/// definitions plus the form-level metadata that ends up in the assembled document.
/// A `Field` declares a type tag from an open set (text, likert, survey, quiz, poll,
/// product, html, ...), optional `Choice` pairs associating opaque value codes with
/// display text, optional composite `Input` sub-fields for multi-row grids and the
/// quiz and survey addon attributes. Forms can be constructed from code or parsed
/// from a well constructed JSON document via `Form::from_path`.
pub mod schema;

/// The module where the submitted entry is defined.
///
/// An `Entry` is one submitted instance of a form: a flat mapping from field
/// identifiers (and composite sub-identifiers such as `"2.1"`) to raw submitted
/// values, plus the entry-level metadata the document metadata section is built
/// from. The creation timestamp is exposed in the handful of formats the document
/// metadata needs, from day-first and month-first dates to a 12 hour clock.
pub mod entry;

/// This module contains the `ContextError` type which is the error type used
/// throughout this library.
///
/// The reason why this type has been implemented is to uniform the error reporting
/// without delving too deep into specific error codes which for such library would be
/// too many and definitely out of scope. The `ContextError` type is always returned
/// from a `Result` type, so the end user can expect an explanation whenever a
/// function fails, including information about the propagated source error.
pub mod error;

/// The module where the document merging primitives live.
///
/// Two operations are exposed: `merge_into`, the deep recursive merge that combines
/// partial document fragments (mapping-versus-mapping conflicts recurse, any other
/// conflict takes the later value), and `replace_key`, the re-keying helper used by
/// the aggregate extractors to rename opaque choice codes into display labels
/// without dropping or duplicating data. Both are total functions.
pub mod merge;

/// The module where the per-field resolvers live.
///
/// A `FieldResolver` turns one field plus the entry into a partial document
/// fragment. The computed value is memoized per resolver instance. Alongside the
/// generic `DefaultResolver` fallback there are specialized resolvers for likert
/// rating grids, list fields, static html blocks, section breaks, signatures and
/// the product field family with its shared line-item context.
pub mod fields;

/// The module where field type tags are dispatched to resolver implementations.
///
/// The `ResolverRegistry` maps type tags to constructor functions, supports caller
/// overrides keyed by exact tag, routes the whole product family to a single
/// product resolver and guarantees a fallback: dispatch never fails the document
/// build, it degrades to the generic resolver instead.
pub mod registry;

/// The module where the batch statistics seam is defined.
///
/// The survey, quiz and poll sections need grouped results across all entries of a
/// form, which only an external backend can supply. The `ResultsProvider` trait
/// models that collaborator; `StaticResultsProvider` serves pre-computed results in
/// tests and in the command line interface, and `UnavailableResultsProvider` models
/// the addon-not-installed case the extractors must survive.
pub mod results;

/// The module where the aggregate sections are extracted.
///
/// One extractor per governing type tag (survey, quiz, poll), each invoked once per
/// document build independent of the per-field loop. Extractors re-key coded choice
/// values to display labels and degrade to an empty fragment when the backing
/// statistics module is unavailable.
pub mod aggregates;

/// The module where the document is assembled.
///
/// The `DocumentAssembler` orchestrates one build: metadata first, then the
/// aggregate sections, then every non-skipped field in schema order through the
/// registry, then the aggregated product totals, and finally the fixed top-level
/// key reordering. The `Generator` front door adds the `FormProvider` and
/// `EntryProvider` collaborators for callers that only hold an entry identifier.
pub mod assembler;
