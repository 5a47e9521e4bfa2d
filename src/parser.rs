//! Template sources: the text format for hand-written trees and the YAML
//! format an editor persists templates in.

mod loader;
mod nom_parser;
mod yaml_parser;

pub use self::{
    loader::{load, load_str},
    nom_parser::{parse_file, ParamDef, TreeDef, TreeRootDef, TreeSource},
    yaml_parser::{load_yaml, save_yaml, NodeTemplate, TreeTemplate},
};
