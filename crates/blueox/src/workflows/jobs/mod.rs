//! Job postings published by staff and browsed by applicants.

pub mod board;
pub mod domain;
pub mod repository;
pub mod router;

pub use board::{JobBoard, JobBoardFilter, JobBoardFacets, SalaryBasis};
pub use domain::{JobDraft, JobId, JobPosting, DEFAULT_EMPLOYER};
pub use repository::JobRepository;
pub use router::job_board_router;
