#[path = "property/genome_codec.rs"]
mod genome_codec;

#[path = "property/mutation_contract.rs"]
mod mutation_contract;

#[path = "property/selection_contract.rs"]
mod selection_contract;

#[path = "property/lineage_integrity.rs"]
mod lineage_integrity;
