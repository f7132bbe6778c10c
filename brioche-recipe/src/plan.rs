//! Build planning
//!
//! A plan lists recipes so that each one comes after everything it depends
//! on. Recipes are grouped into stages: a recipe with no dependencies is in
//! stage 0, and any other recipe is one stage above its highest dependency.
//! Recipes of one stage never depend on each other and can be built in
//! parallel.
//!
//! The order is Kahn's algorithm taken in rounds: each round places every
//! recipe whose dependencies were all placed in earlier rounds, sorted by
//! (name, version). The plan is therefore the stages one after another, and
//! it depends only on the recipe set, never on the order declarations were
//! read in.

use crate::error::Result;
use crate::graph::{RecipeGraph, map_graph_error};
use crate::recipe::{Recipe, RecipeId};
use brioche_graph::NodeId;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Ordered list of recipes to build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    steps: Vec<Recipe>,
    /// Index into `steps` where each stage begins
    stage_starts: Vec<usize>,
    target: Option<RecipeId>,
}

impl BuildPlan {
    /// Plan every recipe in the graph.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::CyclicDependency` if the graph has a cycle.
    pub fn new(graph: &RecipeGraph) -> Result<Self> {
        let order = graph
            .dag()
            .topological_sort_by_key(|id| id)
            .map_err(|e| map_graph_error(graph.dag(), e))?;
        Self::from_order(graph, &order, None)
    }

    /// Plan `target` and everything it transitively depends on.
    ///
    /// # Errors
    ///
    /// - `RecipeError::UnknownRecipe` if `target` is not in the graph
    /// - `RecipeError::CyclicDependency` if the subgraph has a cycle
    pub fn for_target(graph: &RecipeGraph, target: &RecipeId) -> Result<Self> {
        let node = graph.node_id(target)?;
        let mut members = graph.dag().ancestors(node)?;
        let _ = members.insert(node);

        let order = graph
            .dag()
            .topological_sort_within(&members, |id| id)
            .map_err(|e| map_graph_error(graph.dag(), e))?;
        Self::from_order(graph, &order, Some(target.clone()))
    }

    /// Assign stages along a topological order, then lay the plan out
    /// stage by stage.
    fn from_order(graph: &RecipeGraph, order: &[NodeId], target: Option<RecipeId>) -> Result<Self> {
        let dag = graph.dag();

        let mut stage_of: BTreeMap<NodeId, usize> = BTreeMap::new();
        for &node in order {
            let stage = dag
                .dependencies(node)?
                .iter()
                .filter_map(|dependency| stage_of.get(dependency))
                .map(|stage| stage + 1)
                .max()
                .unwrap_or(0);
            let _ = stage_of.insert(node, stage);
        }

        let mut keyed: BTreeSet<(usize, &RecipeId)> = BTreeSet::new();
        for (&node, &stage) in &stage_of {
            let _ = keyed.insert((stage, dag.node(node)?));
        }

        let mut steps = Vec::with_capacity(keyed.len());
        let mut stage_starts = Vec::new();
        for (index, (stage, id)) in keyed.into_iter().enumerate() {
            if stage == stage_starts.len() {
                stage_starts.push(index);
            }
            steps.push(graph.get(id)?.clone());
        }

        debug!(
            "Planned {} recipes in {} stages",
            steps.len(),
            stage_starts.len()
        );

        Ok(Self {
            steps,
            stage_starts,
            target,
        })
    }

    /// Recipes in build order
    pub fn steps(&self) -> &[Recipe] {
        &self.steps
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True for a plan with nothing to build
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps in build order
    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.steps.iter()
    }

    /// Identities of the steps in build order
    pub fn ids(&self) -> impl Iterator<Item = &RecipeId> {
        self.steps.iter().map(|recipe| &recipe.id)
    }

    /// Position of a recipe in the plan
    pub fn position(&self, id: &RecipeId) -> Option<usize> {
        self.steps.iter().position(|recipe| recipe.id == *id)
    }

    /// Whether the plan builds `id`
    pub fn contains(&self, id: &RecipeId) -> bool {
        self.position(id).is_some()
    }

    /// The recipe this plan was made for, if it was restricted to one
    pub fn target(&self) -> Option<&RecipeId> {
        self.target.as_ref()
    }

    /// Recipes grouped by stage, in plan order.
    pub fn stages(&self) -> Vec<&[Recipe]> {
        let mut ends = self.stage_starts.iter().skip(1).copied().chain([self.steps.len()]);
        self.stage_starts
            .iter()
            .filter_map(|&start| ends.next().map(|end| &self.steps[start..end]))
            .collect()
    }

    /// Stage number of a recipe in the plan
    pub fn stage_of(&self, id: &RecipeId) -> Option<usize> {
        let position = self.position(id)?;
        Some(self.stage_starts.partition_point(|&start| start <= position) - 1)
    }
}

impl<'a> IntoIterator for &'a BuildPlan {
    type Item = &'a Recipe;
    type IntoIter = std::slice::Iter<'a, Recipe>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
