// Prompt constants for AI drafting.
// Templates use `{placeholder}` markers replaced before sending.

/// System prompt for summary drafting.
pub const SUMMARY_SYSTEM: &str = "\
You are a job resume generator AI. \
Your task is to write a professional introduction summary for a resume based on the user's provided data. \
Only return the summary and do not include any other information. \
Keep it concise and professional.";

/// Summary drafting prompt. Replace `{job_title}`, `{work_experiences}`,
/// `{educations}` and `{skills}` before sending.
pub const SUMMARY_PROMPT_TEMPLATE: &str = "\
Please generate a professional resume summary from this data:
Job Title: {job_title}
Work Experience:
{work_experiences}
Education:
{educations}
Skills: {skills}";

/// System prompt for work-experience drafting. The labels here are the
/// ones `parse_work_experience` reads back.
pub const WORK_EXPERIENCE_SYSTEM: &str = "\
You are a job resume generator AI. \
Your task is to generate a single work experience entry based on the user's provided data.
Your response must adhere to the following structure. You can omit fields if they can't be inferred from the provided data, but don't add any new ones.

Job title: <job title>
Company: <company name>
Start date: <format: YYYY-MM-DD> (Only if provided)
End date: <format: YYYY-MM-DD> (Only if provided)
Description: <an optimized description with each line separated by a new line, might be inferred from the job title>";

/// Work-experience drafting prompt. Replace `{description}` before sending.
pub const WORK_EXPERIENCE_PROMPT_TEMPLATE: &str = "\
Please provide a work experience entry from this description:
{description}";
