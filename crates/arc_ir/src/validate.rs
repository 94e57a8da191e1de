//! Structural validation of a compiled graph.
//!
//! The runtime does not re-analyze the program; it only needs the wiring to be
//! consistent. Every problem found is reported, not just the first.

use crate::error::{IrError, IrResult};
use crate::graph::{Ir, Node};
use crate::stage::Stage;
use arc_core::{ChannelKey, DataType};
use indexmap::{IndexMap, IndexSet};

impl Ir {
    /// Validate the graph, collecting every problem found
    ///
    /// # Errors
    ///
    /// Returns every structural error in the graph
    pub fn validate(&self) -> Result<(), Vec<IrError>> {
        let mut errors = Vec::new();

        check_unique_keys(self, &mut errors);
        for stage in &self.stages {
            check_stage_types(stage, &mut errors);
        }
        let mut channel_types = IndexMap::new();
        for node in &self.nodes {
            match self.stage(&node.stage) {
                Some(stage) => check_node(node, stage, &mut channel_types, &mut errors),
                None => errors.push(IrError::MissingStage {
                    node: node.key.clone(),
                    stage: node.stage.clone(),
                }),
            }
        }
        check_edges(self, &mut errors);
        check_strata(self, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate the graph, returning only the first problem
    ///
    /// # Errors
    ///
    /// Returns the first structural error in the graph
    pub fn check(&self) -> IrResult<()> {
        match self.validate() {
            Ok(()) => Ok(()),
            Err(errors) => errors.into_iter().next().map_or(Ok(()), Err),
        }
    }
}

fn check_unique_keys(ir: &Ir, errors: &mut Vec<IrError>) {
    let mut seen = IndexSet::new();
    for stage in &ir.stages {
        if !seen.insert(stage.key.as_str()) {
            errors.push(IrError::DuplicateStage(stage.key.clone()));
        }
    }
    let mut seen = IndexSet::new();
    for node in &ir.nodes {
        if !seen.insert(node.key.as_str()) {
            errors.push(IrError::DuplicateNode(node.key.clone()));
        }
    }
}

fn check_stage_types(stage: &Stage, errors: &mut Vec<IrError>) {
    let slots = stage.params.iter().chain(&stage.outputs).chain(&stage.config);
    for param in slots {
        if param.data_type == DataType::Unit {
            errors.push(IrError::UnitParam {
                stage: stage.key.clone(),
                param: param.name.clone(),
            });
        }
    }
}

fn check_node(
    node: &Node,
    stage: &Stage,
    channel_types: &mut IndexMap<ChannelKey, DataType>,
    errors: &mut Vec<IrError>,
) {
    let mut record = |channel: ChannelKey, data_type: DataType, errors: &mut Vec<IrError>| {
        let first = *channel_types.entry(channel).or_insert(data_type);
        if first != data_type {
            errors.push(IrError::ChannelTypeConflict {
                channel,
                first,
                second: data_type,
            });
        }
    };

    let mut read_channels = IndexSet::new();
    let mut fed_params = IndexSet::new();
    for binding in &node.reads {
        if !read_channels.insert(binding.channel) {
            errors.push(IrError::DuplicateChannel {
                node: node.key.clone(),
                channel: binding.channel,
            });
        }
        match stage.param(&binding.param) {
            Some(param) => record(binding.channel, param.data_type, errors),
            None => errors.push(IrError::UnknownParam {
                node: node.key.clone(),
                param: binding.param.clone(),
            }),
        }
        if !fed_params.insert(binding.param.as_str()) {
            errors.push(IrError::DuplicateSource {
                node: node.key.clone(),
                param: binding.param.clone(),
            });
        }
    }

    let mut write_channels = IndexSet::new();
    for binding in &node.writes {
        if !write_channels.insert(binding.channel) {
            errors.push(IrError::DuplicateChannel {
                node: node.key.clone(),
                channel: binding.channel,
            });
        }
        match stage.output(&binding.param) {
            Some(output) => record(binding.channel, output.data_type, errors),
            None => errors.push(IrError::UnknownParam {
                node: node.key.clone(),
                param: binding.param.clone(),
            }),
        }
    }

    for (key, value) in &node.config {
        match stage.config.iter().find(|c| &c.name == key) {
            Some(entry) if entry.data_type != value.data_type() => {
                errors.push(IrError::ConfigType {
                    node: node.key.clone(),
                    key: key.clone(),
                    expected: entry.data_type,
                });
            }
            Some(_) => {}
            None => errors.push(IrError::UnknownParam {
                node: node.key.clone(),
                param: key.clone(),
            }),
        }
    }
}

fn check_edges(ir: &Ir, errors: &mut Vec<IrError>) {
    // Target params already fed by a channel read
    let mut fed: IndexSet<(&str, &str)> = ir
        .nodes
        .iter()
        .flat_map(|n| n.reads.iter().map(move |b| (n.key.as_str(), b.param.as_str())))
        .collect();

    for edge in &ir.edges {
        let source = ir.node(&edge.source.node);
        let target = ir.node(&edge.target.node);
        if source.is_none() {
            errors.push(IrError::UnknownNode(edge.source.node.clone()));
        }
        if target.is_none() {
            errors.push(IrError::UnknownNode(edge.target.node.clone()));
        }

        if let Some(stage) = source.and_then(|n| ir.stage(&n.stage)) {
            if stage.output(&edge.source.param).is_none() {
                errors.push(IrError::UnknownParam {
                    node: edge.source.node.clone(),
                    param: edge.source.param.clone(),
                });
            }
        }
        if let Some(stage) = target.and_then(|n| ir.stage(&n.stage)) {
            if stage.param(&edge.target.param).is_none() {
                errors.push(IrError::UnknownParam {
                    node: edge.target.node.clone(),
                    param: edge.target.param.clone(),
                });
            }
        }

        if !fed.insert((edge.target.node.as_str(), edge.target.param.as_str())) {
            errors.push(IrError::DuplicateSource {
                node: edge.target.node.clone(),
                param: edge.target.param.clone(),
            });
        }
    }
}

fn check_strata(ir: &Ir, errors: &mut Vec<IrError>) {
    for node in ir.strata.levels.keys() {
        if ir.node(node).is_none() {
            errors.push(IrError::UnknownNode(node.clone()));
        }
    }
    for node in &ir.nodes {
        if ir.strata.level(&node.key).is_none() {
            errors.push(IrError::MissingStratum(node.key.clone()));
        }
    }

    for edge in &ir.edges {
        let levels = (
            ir.strata.level(&edge.source.node),
            ir.strata.level(&edge.target.node),
        );
        if let (Some(source_level), Some(target_level)) = levels {
            if target_level <= source_level {
                errors.push(IrError::EdgeNotAscending {
                    source_node: edge.source.node.clone(),
                    target_node: edge.target.node.clone(),
                    source_level,
                    target_level,
                });
            }
        }
    }

    let actual = ir.strata.highest_assigned().unwrap_or(0);
    if ir.strata.max != actual {
        errors.push(IrError::StrataMaxMismatch {
            declared: ir.strata.max,
            actual,
        });
    }
}
