//! Prompt construction.
//!
//! Pure text assembly: few-shot evaluation prompts for the local raters
//! (the demonstration set differs per model family), the summarization
//! prompt reconciling the raters' justifications, and the engagement
//! classification prompt for the secondary stage.

use crate::model::TaskRecord;

const EVAL_PREFIX: &str = "\
Assess the capability of AI technologies\u{2014}Large Language Models (LLMs), Image Processing Systems, and Robotics\u{2014}either individually or in combination, to perform specific tasks within various professions.

For each task, consider:
- Whether LLMs, known for their advanced text understanding and generation, can contribute to the task's completion.
- If Image Processing Systems, with their ability to analyze and interpret visual data, are applicable.
- The role of Robotics in executing tasks that require physical action or manipulation.
- The potential for these AI models to complement each other, enhancing the overall effectiveness.

For each evaluation:
- Rate the combined or individual capability of LLMs, Image Processing Systems, and Robotics on a scale from 1 to 5.
- Provide a detailed justification in the format: [rating, \"justification\"].";

const SHOT_ARCHITECT: &str = "\
Profession: Architect\nTask: Designing a sustainable building.\nExample Evaluation: [4, \"Robotics can assist in model construction, while Image Processing Systems evaluate the designs against environmental standards. LLMs could aid in researching sustainable materials and methods, though the creative and integrative aspects of design might not fully leverage AI capabilities.\"]";

const SHOT_MEDICAL_RESEARCHER: &str = "\
Profession: Medical Researcher\nTask: Analyzing genetic data to predict disease risk.\nExample Evaluation: [5, \"Image Processing Systems can analyze genetic patterns, LLMs can process vast amounts of research to support findings, and Robotics can automate the handling and preparation of genetic samples, collectively enhancing the accuracy and efficiency of disease prediction.\"]";

const SHOT_URBAN_PLANNER: &str = "\
Profession: Urban Planner\nTask: Creating a city's traffic flow optimization plan.\nExample Evaluation: [5, \"Image Processing Systems analyze current traffic patterns and congestion points, while LLMs can process and incorporate relevant research and regulations. Robotics could be used for the physical implementation of traffic control devices. Their combined use allows for a comprehensive and efficient optimization plan.\"]";

const SHOT_ENVIRONMENTAL_SCIENTIST: &str = "\
Profession: Environmental Scientist\nTask: Monitoring and analyzing deforestation rates.\nExample Evaluation: [4, \"Image Processing Systems can provide accurate, real-time analysis of satellite imagery to track deforestation. LLMs could assist in correlating deforestation rates with climate data and policies, offering insights into trends and causes. Robotics, though less directly involved, could aid in physical data collection on the ground.\"]";

const SHOT_FINANCIAL_ANALYST: &str = "\
Profession: Financial Analyst\nTask: Predicting stock market trends.\nExample Evaluation: [3, \"LLMs can analyze news articles and financial reports to gauge market sentiment, but their predictions may lack precision without quantitative analysis. Image Processing Systems and Robotics have limited applicability in directly predicting stock market trends, highlighting the need for specialized AI in finance.\"]";

/// Demonstration set for a local model. The openchat family gets the full
/// five-shot set; the others a single shot.
fn eval_examples(model_name: &str) -> &'static [&'static str] {
    if model_name.contains("openchat") {
        &[
            SHOT_ARCHITECT,
            SHOT_MEDICAL_RESEARCHER,
            SHOT_URBAN_PLANNER,
            SHOT_ENVIRONMENTAL_SCIENTIST,
            SHOT_FINANCIAL_ANALYST,
        ]
    } else {
        &[SHOT_ARCHITECT]
    }
}

/// Few-shot capability-evaluation prompt for one record.
pub fn build_eval_prompt(record: &TaskRecord, model_name: &str) -> String {
    let examples = eval_examples(model_name).join("\n\n");
    format!(
        "{EVAL_PREFIX}\n\n{examples}\n\nGiven the profession: {}, and a specific task: '{}', \
         evaluate the combined or individual capability of these AI technologies to perform the task.",
        record.title, record.task
    )
}

/// Summarization prompt reconciling the raters' justifications into one text.
pub fn build_summary_prompt(record: &TaskRecord, justifications: &[String]) -> String {
    let mut prompt = String::from(
        "You are a text summarization model.\n\
         You will receive as input several texts dealing with LLMs, image processing systems \
         and robotics capabilities for one professional task.\n",
    );
    prompt.push_str(&format!(
        "Job Title: [{}]\nJob Task: [{}]\n",
        record.title, record.task
    ));
    for (i, text) in justifications.iter().enumerate() {
        prompt.push_str(&format!("Text {}: [{}]\n", i + 1, text));
    }
    prompt.push_str(
        "You must summarize those texts in a unique one.\n\
         You must provide the summary into square brackets.\n\
         You must return only the summary.\n\
         You cannot return other elements.\n",
    );
    prompt
}

/// Engagement-classification prompt for the secondary stage. Instructs the
/// judge to echo the title and task so the response can be identity-checked.
pub fn build_engagement_prompt(record: &TaskRecord, summary: &str) -> String {
    format!(
        "You are an expert on the impact of artificial intelligence on the labour market.\n\
         You will receive as input the title of a job profession, a task for this job profession \
         and a description of the impact of different Artificial Intelligence technologies on the \
         task provided as input.\n\
         You must return a numerical value from 1 to 5 that measures the level of engagement of \
         the artificial intelligence in the execution of the task provided as input, based on the \
         description provided as input.\n\
         A value of 1 equals 'no engagement', while a value of 5 equals 'replacement of the human \
         in the execution of the task by artificial intelligence'.\n\
         If a task can be performed by artificial intelligence and requires only complementarity \
         by the human, it must be considered fully automated with a rate of 5.\n\
         In this perspective, you must return a binary flag of 1 if a significant human \
         complementarity is required and 0 if it is not required.\n\
         \n\
         Here are the elements:\n\
         Job Title: [{}]\n\
         Job task: [{}]\n\
         Description of the impact of AI on the task: [{}]\n\
         \n\
         Let's think step by step.\n\
         Return ONLY a JSON object with the following keys: \"job_title\", \"job_task\", \
         \"ai_engagement_level\", \"flag\", \"reasoning\".\n\
         No additional text, no explanations outside the JSON.",
        record.title, record.task, summary
    )
}
