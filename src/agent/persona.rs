//! The two assistant variants: one for teachers, one for students.
//!
//! They share the whole pipeline and differ only in wording and output
//! budget.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistantPersona {
    Teacher,
    Student,
}

impl AssistantPersona {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssistantPersona::Teacher => "teacher",
            AssistantPersona::Student => "student",
        }
    }

    /// Opening line of every system prompt.
    pub fn identity(&self) -> &'static str {
        match self {
            AssistantPersona::Teacher => {
                "Eres **Lección Mágica**, asistente pedagógico para docentes colombianos."
            }
            AssistantPersona::Student => {
                "Eres **Lección Mágica**, tutor paciente y amigable para estudiantes colombianos de primaria y bachillerato."
            }
        }
    }

    /// Style block appended after the grounding material.
    pub fn style(&self) -> &'static str {
        match self {
            AssistantPersona::Teacher => {
                "## Estilo\n- Respuestas BREVES (máximo 5-6 párrafos)\n- Práctico y aplicable en el aula\n- Usa emojis ocasionalmente 📚✨"
            }
            AssistantPersona::Student => {
                "## Estilo\n- Explica paso a paso con ejemplos sencillos\n- Lenguaje claro para tu edad, sin tecnicismos innecesarios\n- Anima al estudiante a pensar antes de darle la respuesta final\n- Usa emojis ocasionalmente 🌟"
            }
        }
    }

    /// Short instructions used when there is no web evidence to cite.
    pub fn plain_instructions(&self) -> &'static str {
        match self {
            AssistantPersona::Teacher => {
                "Responde de forma BREVE y PRÁCTICA. Máximo 3-4 párrafos cortos.\nEnfócate en dar consejos útiles y aplicables en el aula.\nUsa emojis ocasionalmente para hacer el texto más amigable."
            }
            AssistantPersona::Student => {
                "Responde de forma BREVE y CLARA. Máximo 3-4 párrafos cortos.\nExplica con ejemplos cotidianos y comprueba que el concepto quede claro.\nUsa emojis ocasionalmente para hacer el texto más amigable."
            }
        }
    }

    /// Domain criteria embedded in the topic classification prompt.
    pub fn gate_scope(&self) -> &'static str {
        match self {
            AssistantPersona::Teacher => {
                "educación, pedagogía, didáctica, planificación de clases, evaluación, manejo de aula, inclusión educativa, contenidos académicos de cualquier materia escolar o el sistema educativo colombiano (DBA, lineamientos del MEN)"
            }
            AssistantPersona::Student => {
                "tareas escolares, materias del colegio, técnicas de estudio, dudas sobre contenidos académicos, orientación vocacional o la vida escolar en Colombia"
            }
        }
    }

    /// Fixed reply for messages the topic gate turns away.
    pub fn redirect_message(&self) -> &'static str {
        match self {
            AssistantPersona::Teacher => {
                "Hola, soy Lección Mágica, tu asistente pedagógico especializado. 📚\n\nMi función es apoyarte en temas relacionados con educación, enseñanza, aprendizaje y desarrollo académico.\n\nEsta consulta parece estar fuera del ámbito educativo. ¿Tienes alguna pregunta sobre pedagogía, planificación de clases, contenidos académicos o cualquier otro tema educativo en el que pueda ayudarte?"
            }
            AssistantPersona::Student => {
                "¡Hola! Soy Lección Mágica, tu tutor de estudio. 🌟\n\nEstoy aquí para ayudarte con tus tareas, tus materias y todo lo que tenga que ver con aprender.\n\nEsa pregunta no parece ser sobre el colegio. ¿Hay algún tema de clase o alguna tarea en la que te pueda ayudar?"
            }
        }
    }

    pub fn temperature(&self) -> f64 {
        0.7
    }

    pub fn max_tokens(&self) -> i32 {
        match self {
            AssistantPersona::Teacher => 600,
            AssistantPersona::Student => 500,
        }
    }
}
