//! Fixed text shown by every front end.

pub const SYSTEM_INSTRUCTION: &str = "You are MindcareAI, a compassionate, empathetic, and evidence-based mental health assistant focused on support for users in India and globally.

Your goals:
1. Provide emotional support and active listening.
2. Offer evidence-based coping strategies (CBT techniques, mindfulness, grounding exercises).
3. Always maintain a professional yet warm and non-judgmental tone.
4. Help users identify their feelings and navigate mild to moderate stress, anxiety, and low mood.
5. IF A USER INDICATES SELF-HARM OR CRISIS:
   - Immediately provide Indian crisis resources like Tele MANAS (14416) or KIRAN (1800-599-0019).
   - Express sincere concern and clarify that you are an AI.
6. Use Google Search grounding to find reputable mental health resources or clinics in India if requested.
7. Be concise but warm.

DISCLAIMER: You are not a doctor or therapist. Your advice is for supportive purposes only.";

/// Assistant reply appended when a turn fails.
pub const FALLBACK_REPLY: &str =
    "I'm having trouble connecting right now. Please check your API key and network connection, then try again.";

pub const DISCLAIMER: &str = "MindcareAI is for support only. Not a medical clinical tool.";

pub const WELCOME_TITLE: &str = "Welcome to MindcareAI";

pub const WELCOME_TEXT: &str = "I'm here to listen and provide support. You can talk to me about your day, stress, anxiety, or anything else on your mind.";

pub const WELCOME_PROMPTS: &[&str] = &[
    "I've been feeling a bit overwhelmed lately...",
    "Can you suggest some breathing exercises?",
    "Where can I find mental health clinics in Mumbai?",
];

/// Emergency services to call when in immediate danger.
pub const EMERGENCY_NUMBERS: &[&str] = &["112", "100"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrisisResource {
    pub name: &'static str,
    pub number: &'static str,
    pub description: &'static str,
    pub url: &'static str,
}

pub const CRISIS_RESOURCES: &[CrisisResource] = &[
    CrisisResource {
        name: "Tele MANAS (Govt of India)",
        number: "14416 / 1800-89-14416",
        description: "24/7 National Telemental Health Programme of India.",
        url: "https://telemanas.mohfw.gov.in",
    },
    CrisisResource {
        name: "KIRAN Helpline",
        number: "1800-599-0019",
        description: "24/7 Mental Health Rehabilitation Helpline by Ministry of Social Justice.",
        url: "https://disabilityaffairs.gov.in",
    },
    CrisisResource {
        name: "Aasra (Suicide Prevention)",
        number: "9820466726",
        description: "24/7 volunteer-run helpline for those in distress.",
        url: "http://aasra.info",
    },
    CrisisResource {
        name: "Vandrevala Foundation",
        number: "9999666555",
        description: "24/7 crisis support and mental health counseling.",
        url: "https://www.vandrevalafoundation.com",
    },
];

/// Steps shown on the setup screen when no usable API key is configured.
pub const SETUP_STEPS: &[&str] = &[
    "Create a Gemini API key in Google AI Studio",
    "Export it in your shell: export API_KEY=<your key>",
    "Make sure the value is not a placeholder such as YOUR_API_KEY",
    "Restart mindcare",
];
