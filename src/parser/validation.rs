// ABOUTME: Workflow validation logic and dependency checking
// ABOUTME: Produces a report of structural errors, graph errors and warnings before execution

use petgraph::graph::NodeIndex;
use petgraph::Graph;
use std::collections::{HashMap, HashSet, VecDeque};

use super::error::ValidationError;
use super::workflow::WorkflowDefinition;
use crate::scheduler::cadence::Cadence;
use crate::script::ScriptEngine;

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
    pub is_valid: bool,
}

pub struct WorkflowValidator {
    script_engine: ScriptEngine,
}

impl WorkflowValidator {
    pub fn new() -> Self {
        Self {
            script_engine: ScriptEngine::new(),
        }
    }

    /// Validate a complete workflow
    pub fn validate(&self, workflow: &WorkflowDefinition) -> ValidationReport {
        let mut report = ValidationReport::new();

        if let Err(error) = workflow.validate_structure() {
            report.errors.push(error);
            report.is_valid = false;
            return report;
        }

        self.validate_dependencies(workflow, &mut report);
        self.validate_conditions(workflow, &mut report);
        self.validate_callbacks(workflow, &mut report);
        self.validate_trigger(workflow, &mut report);
        self.check_unreachable_tasks(workflow, &mut report);

        report.is_valid = report.errors.is_empty();
        report
    }

    /// Validate task dependencies and detect cycles
    fn validate_dependencies(&self, workflow: &WorkflowDefinition, report: &mut ValidationReport) {
        let task_ids: HashSet<&str> = workflow.tasks.iter().map(|t| t.id.as_str()).collect();

        for task in &workflow.tasks {
            for dep in &task.depends_on {
                if !task_ids.contains(dep.as_str()) {
                    report.errors.push(ValidationError::UnknownDependency {
                        task: task.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        if let Err(cycle) = self.detect_cycles(workflow) {
            report
                .errors
                .push(ValidationError::CircularDependency { tasks: cycle });
        }
    }

    /// Detect circular dependencies using petgraph's topological sort
    fn detect_cycles(&self, workflow: &WorkflowDefinition) -> Result<(), Vec<String>> {
        let mut graph = Graph::<String, ()>::new();
        let mut node_map: HashMap<&str, NodeIndex> = HashMap::new();

        for task in &workflow.tasks {
            let node_id = graph.add_node(task.id.clone());
            node_map.insert(task.id.as_str(), node_id);
        }

        for task in &workflow.tasks {
            let task_node = node_map[task.id.as_str()];
            for dep in &task.depends_on {
                if let Some(&dep_node) = node_map.get(dep.as_str()) {
                    graph.add_edge(dep_node, task_node, ());
                }
            }
        }

        match petgraph::algo::toposort(&graph, None) {
            Ok(_) => Ok(()),
            Err(cycle) => {
                // Report every task that sits on a strongly connected component
                let mut members: Vec<String> = petgraph::algo::kosaraju_scc(&graph)
                    .into_iter()
                    .filter(|component| {
                        component.len() > 1
                            || graph.contains_edge(component[0], component[0])
                    })
                    .flatten()
                    .map(|node| graph[node].clone())
                    .collect();
                if members.is_empty() {
                    members.push(graph[cycle.node_id()].clone());
                }
                members.sort();
                Err(members)
            }
        }
    }

    /// Compile every condition expression without running it
    fn validate_conditions(&self, workflow: &WorkflowDefinition, report: &mut ValidationReport) {
        for task in &workflow.tasks {
            if let Some(ref condition) = task.condition {
                if let Err(error) = self.script_engine.check_syntax(condition) {
                    report.errors.push(ValidationError::InvalidTaskConfig {
                        task: task.id.clone(),
                        reason: format!("invalid condition: {}", error),
                    });
                }
            }
        }
    }

    fn validate_callbacks(&self, workflow: &WorkflowDefinition, report: &mut ValidationReport) {
        for task in &workflow.tasks {
            for callback in task.on_success.iter().chain(task.on_failure.iter()) {
                if !workflow.has_task(callback) {
                    report.warnings.push(format!(
                        "Task '{}' references unknown callback task '{}'",
                        task.id, callback
                    ));
                }
            }
        }
    }

    fn validate_trigger(&self, workflow: &WorkflowDefinition, report: &mut ValidationReport) {
        if let Some(cadence) = workflow.cadence() {
            if let Err(error) = Cadence::parse(cadence) {
                report.errors.push(ValidationError::InvalidCadence {
                    cadence: cadence.to_string(),
                    reason: error.to_string(),
                });
            }
        }
    }

    /// Check for tasks that can never be executed
    fn check_unreachable_tasks(&self, workflow: &WorkflowDefinition, report: &mut ValidationReport) {
        let root_tasks: Vec<String> = workflow
            .tasks
            .iter()
            .filter(|task| task.depends_on.is_empty())
            .map(|task| task.id.clone())
            .collect();

        if root_tasks.is_empty() {
            report
                .warnings
                .push("No root tasks found - all tasks have dependencies".to_string());
            return;
        }

        let mut reachable = HashSet::new();
        let mut queue = VecDeque::from(root_tasks);

        while let Some(current) = queue.pop_front() {
            if reachable.insert(current.clone()) {
                for dependent in workflow.get_dependent_tasks(&current) {
                    if !reachable.contains(&dependent) {
                        queue.push_back(dependent);
                    }
                }
            }
        }

        for task in &workflow.tasks {
            if !reachable.contains(&task.id) {
                report
                    .warnings
                    .push(format!("Task '{}' is unreachable", task.id));
            }
        }
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            is_valid: true,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

impl Default for WorkflowValidator {
    fn default() -> Self {
        Self::new()
    }
}
