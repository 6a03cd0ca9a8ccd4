//! Built-in document templates.
//!
//! Each template seeds a new document and carries a role prompt that is sent
//! to the agent as `systemPrompt` metadata.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub text: &'static str,
    pub system_prompt: &'static str,
}

const TEMPLATES: &[Template] = &[
    Template {
        id: "process",
        name: "Process Flowchart",
        description: "Start, steps, a decision and an end.",
        text: "# Process\n\n\
               ```flow\n\
               [[start]] Begin\n\
               [step_1] Gather input\n\
               {check} Valid?\n\
               [step_2] Fix input\n\
               ((end)) Done\n\
               \n\
               [start] -> [step_1]\n\
               [step_1] -> [check]\n\
               [check] -> [end] : Yes\n\
               [check] -> [step_2] : No\n\
               [step_2] -> [step_1]\n\
               ```\n",
        system_prompt: "You design business process flowcharts. Use a single start node, \
                        decision nodes for every branch, and label branch edges.",
    },
    Template {
        id: "mindmap",
        name: "Mind Map",
        description: "A central topic with radiating categories.",
        text: "# Mind Map\n\n\
               ```flow\n\
               [[center]] Main Topic\n\
               [cat_1] Category A\n\
               [cat_2] Category B\n\
               [item_1] Idea\n\
               \n\
               [center] -> [cat_1]\n\
               [center] -> [cat_2]\n\
               [cat_1] -> [item_1]\n\
               ```\n",
        system_prompt: "You facilitate brainstorming. Grow the map outward from the center; \
                        keep labels short.",
    },
    Template {
        id: "state_machine",
        name: "State Machine",
        description: "States, guarded transitions and a final state.",
        text: "# State Machine\n\n\
               ```flow\n\
               [[idle]] Idle\n\
               [running] Running\n\
               {guard} Finished?\n\
               ((done)) Completed\n\
               \n\
               [idle] -> [running] : start()\n\
               [running] -> [guard]\n\
               [guard] -> [done] : yes\n\
               [guard] -> [running] : no\n\
               ```\n",
        system_prompt: "You model software state machines. Label every transition with \
                        the event that triggers it.",
    },
    Template {
        id: "fishbone",
        name: "Cause and Effect",
        description: "Cause categories feeding one effect.",
        text: "# Cause and Effect\n\n\
               ```flow\n\
               [[cause_people]] People\n\
               [[cause_process]] Process\n\
               [[cause_tools]] Tools\n\
               ((effect)) Problem\n\
               \n\
               [cause_people] -> [effect]\n\
               [cause_process] -> [effect]\n\
               [cause_tools] -> [effect]\n\
               ```\n",
        system_prompt: "You run root-cause analysis. Add concrete causes under each \
                        category and connect them toward the effect.",
    },
];

#[must_use]
pub fn templates() -> &'static [Template] {
    TEMPLATES
}

#[must_use]
pub fn template(id: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.id == id)
}
