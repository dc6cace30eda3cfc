//! Static guidance prompts served over MCP `prompts/*`.

use rmcp::model::{
    GetPromptResult, ListPromptsResult, Prompt, PromptMessage, PromptMessageRole,
};
use rmcp::ErrorData as McpError;

const DOCKSTORE_SEARCH: &str = r#"Provide a Dockstore workflow search configuration.

1. query: list of clauses, each [field, operator, term]
   example: ["description", "AND", "gatk"]

2. Searchable fields:
   - full_workflow_path: full workflow path (exact location)
   - description: workflow description
   - name: workflow name
   - author: author name
   - organization: organization name
   - labels: workflow labels
   - content: workflow source file content

3. Operators:
   - AND: the clause must match together with the others
   - OR: any matching clause is enough

4. query_type:
   - match_phrase: exact phrase matching (default)
   - wildcard: pattern matching, terms are wrapped as *term*

5. Other options:
   - sentence: treat the terms as one sentence with flexible word order
   - top_n: number of results to return (default 3)

Examples:

Basic search:
{
  "query": [["description", "AND", "gatk"]],
  "query_type": "match_phrase"
}

Multi-clause search:
{
  "query": [
    ["organization", "AND", "broadinstitute"],
    ["description", "AND", "variant"],
    ["description", "AND", "calling"]
  ],
  "query_type": "match_phrase",
  "sentence": true
}

Wildcard search:
{
  "query": [["full_workflow_path", "AND", "cnv"]],
  "query_type": "wildcard"
}"#;

const DOCKSTORE_DOWNLOAD: &str = r#"Provide a Dockstore workflow download configuration.

1. url: the workflow URL or path
   - taken from a search_dockstore result
   - example: "github.com/broadinstitute/gatk-workflows/cnv-workflow"
   - full URLs like "https://dockstore.org/workflows/..." also work

2. output_path: directory to download into (default ".")

Example:
{
  "url": "github.com/broadinstitute/gatk-workflows/cnv-workflow",
  "output_path": "./workflows"
}

Notes:
- files land under <output_path>/<organization>_<workflow_name>/
- a workflow_metadata.json records the version that was fetched
- the reply names the directory holding the .wdl files"#;

const WDL_DEVELOPMENT: &str = r#"Workflow development lifecycle on Bio-OS:

1. Author the WDL and check its syntax with validate_wdl.
2. Generate or write an inputs template, then fill it per sample with
   compose_input_json; check the result with validate_workflow_input_json.
3. Import the workflow into a workspace with import_workflow and poll
   check_workflow_import_status until it reports success.
4. Submit with submit_workflow (set monitor/monitor_interval to follow the
   run), or poll check_workflow_run_status yourself.
5. Fetch logs for a finished submission with get_workflow_logs.

Credentials: pass ak/sk explicitly or export MIRACLE_ACCESS_KEY and
MIRACLE_SECRET_KEY. The endpoint defaults to the public Bio-OS instance and
can be overridden per call."#;

const WORKFLOW_INPUTS: &str = r#"Compose an inputs.json from a womtool-style template.

Template values may carry optionality markers:
- "String"                                -> required
- "Int (optional, default = 4)"           -> optional, default applied
- "String? (optional)"                    -> optional, omitted unless given

compose_input_json parameters:
- template_json: path to the template file
- output_json: where to write the filled list
- sample_count: number of samples
- params: one object (replicated for every sample) or a list of objects
  (length sample_count, or length 1 which is replicated)

Rules:
- every required key must be present in each sample
- keys the template does not know are rejected
- defaults are parsed as bool / int / float / string"#;

struct PromptSpec {
    name: &'static str,
    description: &'static str,
    text: &'static str,
}

const PROMPTS: [PromptSpec; 4] = [
    PromptSpec {
        name: "dockstore_search",
        description: "How to build search_dockstore queries (fields, operators, query types)",
        text: DOCKSTORE_SEARCH,
    },
    PromptSpec {
        name: "dockstore_download",
        description: "How to download a workflow found on Dockstore",
        text: DOCKSTORE_DOWNLOAD,
    },
    PromptSpec {
        name: "wdl_development",
        description: "End-to-end WDL development and submission flow on Bio-OS",
        text: WDL_DEVELOPMENT,
    },
    PromptSpec {
        name: "workflow_inputs",
        description: "How to compose and validate an inputs.json from a template",
        text: WORKFLOW_INPUTS,
    },
];

pub fn list() -> ListPromptsResult {
    ListPromptsResult {
        next_cursor: None,
        prompts: PROMPTS
            .iter()
            .map(|p| Prompt::new(p.name, Some(p.description), None))
            .collect(),
    }
}

pub fn get(name: &str) -> Result<GetPromptResult, McpError> {
    let spec = PROMPTS
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| McpError::invalid_params(format!("unknown prompt: {name}"), None))?;
    Ok(GetPromptResult {
        description: Some(spec.description.to_string()),
        messages: vec![PromptMessage::new_text(PromptMessageRole::User, spec.text)],
    })
}
