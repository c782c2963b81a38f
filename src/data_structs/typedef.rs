use std::hash::Hash;

use num::{
    PrimInt,
    Unsigned,
};

/// 1-based sequence coordinate.
pub type PosType = u32;
/// NCBI taxonomy identifier.
pub type TaxonId = u32;

pub trait SeqPosNum: Unsigned + PrimInt + Hash {}

impl<T> SeqPosNum for T where T: Unsigned + PrimInt + Hash {}
