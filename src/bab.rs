// Copyright 2026 by the timetabler authors
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with
// the License. You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the License for the
// specific language governing permissions and limitations under the License.

//! This module provides a generic implementation of the branch and bound algorithm using a parallel pseudo-depth-first
//! search, minimizing a score.
//!
//! The basic idea is to spawn a number of worker threads to solve the subproblems in parallel. The pending subproblems
//! (nodes in the Branch and Bound tree) are stored on a heap (priority queue), ordered by the subproblems' `Ord`
//! implementation, which should prefer deeper nodes. This way, the worker threads can work in parallel, while
//! preferring to dig into the depth of the Branch and Bound tree, which will give good upper bounds for bounding the
//! branches sooner.
//!
//! The best feasible solution, found so far, is kept with the subproblem queue in a shared data structure. Its score is
//! handed to the node solver when a subproblem is started, so the node solver can bound the subproblem itself.
//!
//! The worker threads are stopped, as soon as no pending subproblems are left *and* no thread is still busy (and could
//! produce new pending subproblems), as soon as a solution reaches the target score, or when a limit is exceeded.

use log::debug;
use num_traits::bounds::Bounded;
use std::collections::BinaryHeap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Instant;

/// Struct to hold the synchronization information for the parallel execution. It contains a mutex-ed SharedState object
/// And a Condvar to allow worker threads to sleep-wait for new subproblems to solve.
struct BranchAndBound<SubProblem: Ord + Send, Solution: Send, Score> {
    shared_state: Mutex<SharedState<SubProblem, Solution, Score>>,
    condvar: Condvar,
    target: Score,
    limits: Limits,
}

/// The shared state of the worker threads of the parallel branch and bound execution
struct SharedState<SubProblem: Ord, Solution, Score> {
    /// The prioritized queue of pending subproblems
    pending_nodes: BinaryHeap<SubProblem>,
    /// The number of currently busy worker threads. It is used to determine the end of execution (no pending problems
    /// and no busy workers left)
    busy_threads: u32,
    /// The best solution, found so far
    best_result: Option<Solution>,
    /// The score of the best solution, found so far
    best_score: Score,
    /// Number of subproblems started so far
    num_nodes: u64,
    /// Set, when the search is stopped by a limit. Pending subproblems are dropped in this case.
    aborted: bool,
}

/// Result type for solving a single branch and bound node.
#[derive(Debug)]
pub enum NodeResult<SubProblem, Solution, Score> {
    /// No solution at all (subproblem was infeasible or bounded by the best known score)
    NoSolution,
    /// No solution for the main problem yet, with a list of more restricted SubProblems ("branches") to try and a lower
    /// bound of their scores to bound the branches by comparing with the current best solution.
    Branch(Vec<SubProblem>, Score),
    /// A feasible solution for the main problem (including the solution's score to compare to other solutions)
    Feasible(Solution, Score),
}

/// Limits for stopping the search before the branch and bound tree is exhausted
#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub max_nodes: Option<u64>,
    pub deadline: Option<Instant>,
}

/// Result of a branch and bound run
#[derive(Debug)]
pub struct Outcome<Solution, Score> {
    /// The best solution and its score, if any has been found
    pub best: Option<(Solution, Score)>,
    /// True if the search was not stopped by a limit, i.e. the result is optimal (or there is no solution at all)
    pub complete: bool,
    /// Number of subproblems evaluated
    pub num_nodes: u64,
}

/// Main function of this module to solve a generic problem by doing pseudo-depth-first parallel branch and bound
/// minimization.
/// This function takes a callback function, which is executed for each single node in the branch and bound tree with the
/// subproblem and the best score known so far. It returns either a feasible solution to be considered for the result
/// or a `Vec` of new subproblems to try (see `NodeResult` type). When all branches of the branch and bound tree are
/// evaluated (or bound), the best result is returned. A solution with a score less or equal `target` is accepted as
/// optimal immediately.
pub fn solve<
    SubProblem: 'static + Ord + Send,
    Solution: 'static + Send,
    Score: 'static + PartialOrd + Bounded + Send + Sync + Copy,
    F: 'static,
>(
    node_solver: F,
    base_problem: SubProblem,
    num_threads: u32,
    target: Score,
    limits: Limits,
) -> Outcome<Solution, Score>
where
    F: (Fn(SubProblem, Score) -> NodeResult<SubProblem, Solution, Score>) + Send + Sync,
{
    // Create shared data structure with base problem
    let mut pending_nodes = BinaryHeap::<SubProblem>::new();
    pending_nodes.push(base_problem);
    let bab = Arc::new(BranchAndBound {
        shared_state: Mutex::new(SharedState {
            pending_nodes,
            busy_threads: 0,
            best_result: None,
            best_score: Score::max_value(),
            num_nodes: 0,
            aborted: false,
        }),
        condvar: Condvar::new(),
        target,
        limits,
    });

    // Spawn worker threads
    let mut workers = Vec::<thread::JoinHandle<()>>::new();
    let node_solver = Arc::new(node_solver);
    for _i in 0..num_threads.max(1) {
        let bab_clone = bab.clone();
        let node_solver_clone = node_solver.clone();
        workers.push(thread::spawn(move || worker(bab_clone, node_solver_clone)));
    }

    // Wait for worker threads to finish
    for worker in workers {
        worker.join().unwrap();
    }

    // Unwrap and return result
    let mut shared_state = bab.shared_state.lock().unwrap();
    let best_score = shared_state.best_score;
    Outcome {
        best: shared_state.best_result.take().map(|x| (x, best_score)),
        complete: !shared_state.aborted,
        num_nodes: shared_state.num_nodes,
    }
}

impl Limits {
    fn exceeded(&self, num_nodes: u64) -> bool {
        self.max_nodes.map_or(false, |max| num_nodes >= max)
            || self.deadline.map_or(false, |deadline| Instant::now() >= deadline)
    }
}

/// Worker thread entry point for the parallel branch and bound solving
fn worker<SubProblem: Ord + Send, Solution: Send, Score: PartialOrd + Copy>(
    bab: Arc<BranchAndBound<SubProblem, Solution, Score>>,
    node_solver: Arc<dyn Fn(SubProblem, Score) -> NodeResult<SubProblem, Solution, Score> + Send + Sync>,
) {
    let mut shared_state = bab.shared_state.lock().unwrap();
    loop {
        if !shared_state.aborted && bab.limits.exceeded(shared_state.num_nodes) {
            debug!("Stopping search after {} nodes, since a limit was exceeded.", shared_state.num_nodes);
            shared_state.aborted = true;
            shared_state.pending_nodes.clear();
        }

        // In case of pending subproblems, get one and solve it
        if let Some(subproblem) = shared_state.pending_nodes.pop() {
            shared_state.busy_threads += 1;
            shared_state.num_nodes += 1;
            let best_score = shared_state.best_score;

            // Unlock shared_state and solve subproblem
            std::mem::drop(shared_state);
            let result = node_solver(subproblem, best_score);

            // Reacquire shared_state lock and interpret subproblem result
            shared_state = bab.shared_state.lock().unwrap();
            shared_state.busy_threads -= 1;
            match result {
                NodeResult::NoSolution => (),

                NodeResult::Feasible(solution, score) => {
                    if score < shared_state.best_score {
                        debug!("Wow, this is the best solution, we found so far. Let's store it.");
                        shared_state.best_result = Some(solution);
                        shared_state.best_score = score;
                        if score <= bab.target {
                            debug!("The solution reaches the target score. Dropping all pending subproblems.");
                            shared_state.pending_nodes.clear();
                        }
                    }
                }

                NodeResult::Branch(new_problems, bound) => {
                    // Only consider more restricted new_problems, if their bound is better than the best solution
                    // known so far. The bound is checked again by the node solver, when a subproblem is started.
                    if bound < shared_state.best_score && !shared_state.aborted {
                        for (i, new_problem) in new_problems.into_iter().enumerate() {
                            shared_state.pending_nodes.push(new_problem);
                            // Wake up n-1 other threads to solve the new subproblems
                            if i != 0 {
                                bab.condvar.notify_one();
                            }
                        }
                    } else {
                        debug!("Bounding this branch, since its bound is not better than the best known solution.");
                    }
                }
            }

            // check if we are finished, awake other threads and exit
            if shared_state.pending_nodes.is_empty() && shared_state.busy_threads == 0 {
                bab.condvar.notify_all();
                break;
            }

        // Otherwise wait for new subproblems
        } else if shared_state.busy_threads > 0 {
            // Wait for notification by other threads. CondVar.wait() automatically handles the mutex unlock and re-lock
            // for us.
            shared_state = bab.condvar.wait(shared_state).unwrap();

        // If no work is left to do, exit
        } else {
            bab.condvar.notify_all();
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Limits, NodeResult};

    /// Subproblem of a toy knapsack-like problem: choose a subset of `WEIGHTS` with total weight >= 10 and minimal
    /// number of items.
    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Node {
        chosen: Vec<bool>,
    }

    impl Ord for Node {
        fn cmp(&self, other: &Self) -> std::cmp::Ordering {
            self.chosen.len().cmp(&other.chosen.len())
        }
    }

    impl PartialOrd for Node {
        fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
            Some(self.cmp(other))
        }
    }

    const WEIGHTS: [u32; 5] = [2, 7, 3, 5, 1];

    fn solve_node(node: Node, best: u32) -> NodeResult<Node, Vec<bool>, u32> {
        let items = node.chosen.iter().filter(|c| **c).count() as u32;
        if items >= best {
            return NodeResult::NoSolution;
        }
        let weight: u32 = node
            .chosen
            .iter()
            .zip(WEIGHTS.iter())
            .filter(|(c, _)| **c)
            .map(|(_, w)| w)
            .sum();
        if weight >= 10 {
            return NodeResult::Feasible(node.chosen, items);
        }
        if node.chosen.len() == WEIGHTS.len() {
            return NodeResult::NoSolution;
        }
        let mut with = node.clone();
        with.chosen.push(true);
        let mut without = node;
        without.chosen.push(false);
        NodeResult::Branch(vec![without, with], items)
    }

    #[test]
    fn finds_optimum() {
        let outcome = super::solve(solve_node, Node { chosen: vec![] }, 3, 0, Limits::default());
        assert!(outcome.complete);
        let (solution, score) = outcome.best.unwrap();
        assert_eq!(score, 2);
        let weight: u32 = solution
            .iter()
            .zip(WEIGHTS.iter())
            .filter(|(c, _)| **c)
            .map(|(_, w)| w)
            .sum();
        assert!(weight >= 10);
        assert!(solution[1], "The heavy item should be part of every optimal solution");
    }

    #[test]
    fn no_solution() {
        let outcome = super::solve(
            |_node: Node, _best: u32| NodeResult::<Node, (), u32>::NoSolution,
            Node { chosen: vec![] },
            2,
            0,
            Limits::default(),
        );
        assert!(outcome.complete);
        assert!(outcome.best.is_none());
        assert_eq!(outcome.num_nodes, 1);
    }

    #[test]
    fn node_limit() {
        let limits = Limits {
            max_nodes: Some(1),
            deadline: None,
        };
        let outcome = super::solve(solve_node, Node { chosen: vec![] }, 1, 0, limits);
        assert!(!outcome.complete);
        assert!(outcome.best.is_none());
        assert_eq!(outcome.num_nodes, 1);
    }
}
