pub(crate) mod dependency;
pub(crate) mod parameter;
pub(crate) mod product;
