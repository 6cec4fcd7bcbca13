//! Administrator override directives and the merge engine that applies them

pub mod directive;
pub mod merge;

pub use directive::{
    AccountDirective, Directive, DirectiveSet, MalformedRecord, MergeMode, SubjectDirective,
};
pub use merge::{expand_all, is_all, merge_list, MergeIssue, MergeReport, ALL_ACCOUNTS};
