//! Pipeline stages for document assembly.
//!
//! Each submodule implements exactly one step. The facade in
//! [`crate::convert`] picks the stages a request needs.
//!
//! ## Data Flow
//!
//! ```text
//!                  ┌─ pdf ──────────────────────────┐
//! inspect ──▶ kind ├─ png/jpg ──▶ image ────────────┼──▶ staging ──▶ destination
//!                  └─ docx ─────▶ render ───────────┘      (temp + rename)
//!
//! pdf, pdf, … ──▶ merge (copy objects, renumber, page tree) ──▶ staging
//! ```
//!
//! 1. [`inspect`]: classify by extension; read page count, pixel size or
//!    header version on demand
//! 2. [`image`]: decode a PNG/JPEG and wrap it in a one-page PDF
//! 3. [`render`]: hand a word-processor document to an external backend
//! 4. [`merge`]: concatenate parsed PDFs into one document
//! 5. [`staging`]: write to a sibling temp file, rename on success

pub mod image;
pub mod inspect;
pub mod merge;
pub mod render;
pub mod staging;
