// Prompt templates for the contract assistant tasks.
// Placeholders use `{name}` and are filled by `template::fill_template` in a single pass.

/// Contract drafting. Replace: {contract_type}, {country}, {party_one}, {party_two}, {contract_terms}
pub const DRAFT_PROMPT_TEMPLATE: &str = r#"You are a legal expert tasked with drafting a {contract_type} contract that adheres to the legal standards and practices of {country}. Below are the details to be included in the contract:

- Party One: {party_one}
- Party Two: {party_two}
- Key Terms: {contract_terms}

Instructions:
1. Draft a comprehensive {contract_type} contract based on the provided details, ensuring that it conforms to the legal requirements and customary practices of {country}.
2. Ensure that all necessary clauses and provisions specific to {country} are included, such as governing law, dispute resolution, and any mandatory legal disclosures.
3. Structure the contract in a clear, logical format, including sections for definitions, obligations, terms, conditions, and signatures.
4. Use precise and legally sound language suitable for a formal legal document.

Deliver a complete and professional contract ready for review and execution by both parties."#;

/// Contract review. Replace: {contract_text}
pub const REVIEW_PROMPT_TEMPLATE: &str = r#"You are a legal expert tasked with reviewing the following contract to identify its key clauses and any potential legal issues:

Contract Text:
{contract_text}

Instructions:
1. Carefully analyze the contract text to identify all key clauses, including but not limited to:
- Parties Involved
- Payment Terms
- Confidentiality
- Termination
- Governing Law
- Dispute Resolution
- Liability and Indemnification
2. For each key clause, provide a brief summary that explains its purpose and relevance in the context of the contract.
3. Identify any potential legal issues, ambiguities, or areas of concern, including:
- Inconsistent or unclear language
- Missing or incomplete clauses
- Unbalanced terms that may favor one party disproportionately
- Any clauses that may not comply with relevant laws or regulations
4. Offer recommendations for addressing the identified issues, suggesting revisions or additional clauses if necessary.
5. Structure the summary in a clear and organized format, with sections dedicated to key clauses, potential issues, and recommendations.

Deliver a detailed and professional summary that is ready for legal review."#;

/// Clause suggestion. Replace: {contract_text}
pub const CLAUSE_SUGGESTION_PROMPT_TEMPLATE: &str = r#"You are a legal expert tasked with reviewing the following contract to identify any gaps and suggest additional clauses that may be necessary or beneficial:

Contract Text:
{contract_text}

Instructions:
1. Carefully review the provided contract text to understand its context, purpose, and key terms.
2. Identify any areas where the contract may be lacking necessary clauses or where additional clauses could strengthen the agreement. Consider the following aspects:
- Legal compliance based on jurisdiction
- Protection of parties' rights and obligations
- Risk mitigation and dispute resolution
- Confidentiality, liability, and indemnification
- Industry-specific requirements
3. Before recommending each clause, provide a brief reasoning for its necessity, focusing on:
- Identified gaps or vulnerabilities in the current contract
- Potential legal risks or ambiguities that the clause would address
- Enhancements to the clarity, enforceability, or balance of the contract
4. Suggest each additional clause with a clear and concise explanation of its purpose and the benefits it would bring to the contract.

Deliver a well-reasoned list of recommended clauses, ensuring that each suggestion is relevant and adds value to the contract."#;

/// Compliance check. Replace: {contract_text}
pub const COMPLIANCE_PROMPT_TEMPLATE: &str = r#"As a legal analyst, your task is to review and assess the compliance of the following contract with its specified terms and conditions:

Contract Text:
{contract_text}

Instructions:
1. Identify and summarize each key term and obligation outlined in the contract.
2. Evaluate the compliance status of each term:
- Fully Compliant
- Partially Compliant (Specify areas of concern)
- Non-Compliant (Highlight breaches or deviations)
3. Provide a comprehensive summary that includes:
- An overview of fully compliant areas.
- Details of any partial compliance, with recommendations for rectification.
- A clear identification of any non-compliance, specifying the clauses breached and potential legal implications.
4. Conclude with any additional observations or recommendations for ensuring full compliance.

Deliver your analysis in a clear, structured format suitable for legal review."#;

/// Document comparison. Replace: {original_contract}, {new_contract}
pub const COMPARISON_PROMPT_TEMPLATE: &str = r#"You are a legal expert tasked with comparing two versions of a contract to identify and analyze any differences between them.

Original Contract:
{original_contract}

Updated Contract:
{new_contract}

Instructions:
1. Conduct a thorough comparison of the two contracts, focusing on changes in key terms, obligations, conditions, and any other critical provisions.
2. Highlight each difference found, categorizing them as follows:
- Minor changes (e.g., wording adjustments with no impact on the meaning)
- Significant changes (e.g., alterations to terms, obligations, or legal implications)
- Additions or removals of clauses
3. For each significant difference, provide a brief analysis of its potential impact on the rights and obligations of the parties involved.
4. Ensure that the summary is structured clearly, with sections dedicated to minor changes, significant changes, and an overall assessment of how the updated contract differs from the original.
5. Conclude with any recommendations or considerations for further review, particularly if the changes could lead to legal or practical concerns.

Deliver a well-organized and concise summary suitable for legal review."#;

/// Document categorization. Replace: {document_text}
pub const CATEGORIZATION_PROMPT_TEMPLATE: &str = r#"You are a legal expert tasked with identifying the type of legal document based on the following text:

Document Text:
{document_text}

Instructions:
1. Analyze the content, structure, and key terms within the document to determine its purpose and function.
2. Identify the specific type of legal document (e.g., Non-Disclosure Agreement, Employment Agreement, Lease Contract) by considering the nature of the obligations, parties involved, and legal context.
3. Provide a clear and concise explanation for the categorization, highlighting the features or clauses that led to your determination.
4. If applicable, mention any nuances or specific elements that distinguish this document from similar types of legal documents.

Deliver a precise categorization along with a reasoned explanation that supports your determination."#;
