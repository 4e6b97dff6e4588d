//! Pull rendering of one quantum.

use super::{ContextState, Graph, NodeId, NodeKind};
use std::collections::{HashMap, VecDeque};
use tracing::trace;

impl Graph {
    /// Render `frames` frames of interleaved stereo from the destination.
    ///
    /// Every node is processed once per quantum, connected or not, so media
    /// elements keep their own clock while detached.
    pub(crate) fn render(&mut self, frames: usize) -> Vec<f32> {
        if self.resume_pending && self.state == ContextState::Suspended {
            self.state = ContextState::Running;
            self.resume_pending = false;
            trace!("Resume completed");
        }
        let len = frames * 2;
        if self.state != ContextState::Running {
            return vec![0.0; len];
        }

        let order = self.processing_order();
        let mut inputs: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for (&id, node) in &self.nodes {
            for &out in &node.outputs {
                inputs.entry(out).or_default().push(id);
            }
        }

        let sample_rate = self.sample_rate;
        let mut rendered: HashMap<NodeId, Vec<f32>> = HashMap::with_capacity(order.len());
        let mut result = vec![0.0; len];

        for id in order {
            let mut buffer = vec![0.0f32; len];
            if let Some(sources) = inputs.get(&id) {
                for source in sources {
                    if let Some(upstream) = rendered.get(source) {
                        for (acc, s) in buffer.iter_mut().zip(upstream) {
                            *acc += s;
                        }
                    }
                }
            }

            let Some(node) = self.nodes.get_mut(&id) else {
                continue;
            };
            match &mut node.kind {
                NodeKind::Destination => result.copy_from_slice(&buffer),
                NodeKind::Gain { gain } => {
                    let gain = *gain;
                    buffer.iter_mut().for_each(|s| *s *= gain);
                }
                NodeKind::Biquad(filter) => filter.process(&mut buffer, sample_rate),
                NodeKind::StereoPanner(panner) => panner.process(&mut buffer),
                NodeKind::ElementSource(element) => buffer = element.render(frames, sample_rate),
                NodeKind::StreamSource(stream) => buffer = stream.read(frames),
                NodeKind::Processor(processor) => {
                    let mut output = vec![0.0f32; len];
                    processor.process(&buffer, &mut output, sample_rate);
                    buffer = output;
                }
            }
            rendered.insert(id, buffer);
        }

        self.frames_rendered += frames as u64;
        result
    }

    /// Topological order of all nodes; ties resolve by ascending id.
    fn processing_order(&self) -> Vec<NodeId> {
        let mut in_degree: HashMap<NodeId, usize> =
            self.nodes.keys().map(|&id| (id, 0)).collect();
        for node in self.nodes.values() {
            for out in &node.outputs {
                if let Some(d) = in_degree.get_mut(out) {
                    *d += 1;
                }
            }
        }

        let mut ready: Vec<NodeId> = in_degree
            .iter()
            .filter(|&(_, &d)| d == 0)
            .map(|(&id, _)| id)
            .collect();
        ready.sort();
        let mut queue: VecDeque<NodeId> = ready.into();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(id) = queue.pop_front() {
            order.push(id);
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            let mut next = Vec::new();
            for out in &node.outputs {
                if let Some(d) = in_degree.get_mut(out) {
                    *d -= 1;
                    if *d == 0 {
                        next.push(*out);
                    }
                }
            }
            next.sort();
            queue.extend(next);
        }
        order
    }
}
