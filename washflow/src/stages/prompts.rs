//! Default watercolor instructions.

use crate::core::StageKind;

/// System instruction prepended to every stage prompt by default.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an expert watercolor painting generator that creates step-by-step paintings from photographs.
CRITICAL RULES YOU MUST ALWAYS FOLLOW:
1. NEVER add any objects, people, or elements that are not present in the original image
2. ALWAYS maintain the EXACT same composition as the reference images
3. ONLY add the specific elements requested in each step
4. Use transparent watercolor techniques - colors should be translucent and flow naturally
5. Preserve the original aspect ratio and resolution
6. Follow watercolor progression: light to dark, transparent layers, wet-on-wet and wet-on-dry techniques
7. Maintain white paper for highlights - watercolor cannot add white paint
8. Use proper watercolor color mixing and bleeding effects";

const SKETCH: &str = "Generate ONLY a very light, minimal pencil sketch that captures the basic shapes and main contours from the original image. The lines should be extremely light and loose, just enough to guide the watercolor painting. This is typical watercolor preparation - barely visible guidelines on white watercolor paper.";

const WASH_1: &str = "Create the first watercolor wash using very light, transparent colors. 1. Apply broad, light washes of the main color areas from the original image. 2. Use wet-on-wet technique - colors should blend and flow naturally. 3. Keep all colors very light and transparent - this is just the base layer. 4. Leave white paper areas for the lightest highlights completely untouched. 5. Use the light sketch as a guide but let the watercolor flow naturally beyond the lines. 6. Focus on establishing the basic color temperature and mood.";

const WASH_2: &str = "Add a second layer of watercolor washes to build up color intensity. 1. Use the first wash as your foundation - work on DRY paper for more control. 2. Add slightly stronger, but still transparent colors in the medium-tone areas. 3. Begin to define shapes more clearly while maintaining watercolor's flowing quality. 4. Continue to preserve white paper highlights - once painted over, they cannot be recovered. 5. Use wet-on-dry technique for more defined edges where needed. 6. Layer transparent colors to create depth and richness.";

const MEDIUM_TONE: &str = "Build up medium tone values with careful watercolor layering. 1. Work from the previous wash layer, adding medium-strength transparent colors. 2. Begin to establish form and volume through careful value control. 3. Use a combination of wet-on-dry for controlled edges and wet-on-wet for soft transitions. 4. Maintain the luminosity characteristic of watercolor - avoid muddy colors. 5. Continue protecting white areas and light tones established in previous layers.";

const SHADOW: &str = "Develop the shadow areas with stronger, but still transparent watercolor layers. 1. Build on the previous medium tone layer without losing its transparency. 2. Add deeper, richer colors in the shadow areas using multiple transparent glazes. 3. Maintain the wet, flowing quality of watercolor while gaining more control over shapes. 4. Use color temperature variations - warm and cool colors to create depth. 5. Allow some colors to blend naturally while controlling others with wet-on-dry technique.";

const DETAIL: &str = "Add details and texture while maintaining watercolor's characteristic transparency. 1. Work from the shadow layer, adding carefully controlled details. 2. Use fine brushwork for details but keep the overall watercolor aesthetic. 3. Add texture through varied brushstrokes and controlled color bleeding. 4. Maintain the balance between detail and the loose, flowing quality of watercolor. 5. Use both wet-on-wet for soft details and wet-on-dry for crisp edges where appropriate.";

const DARKEST_VALUE: &str = "Add the deepest, darkest values to complete the tonal range of the watercolor painting. 1. Build from the detailed layer, adding only the very darkest shadow areas. 2. Use rich, concentrated watercolor pigments but maintain transparency. 3. These darks should be painted with confidence in single, decisive strokes. 4. Ensure the darkest values provide proper contrast with the preserved white highlights. 5. Maintain the luminous quality that makes watercolor distinctive.";

const FINISH: &str = "Complete the watercolor painting with final touches and refinements. 1. Build from the previous layer, making only subtle final adjustments. 2. Add any final small details or accents that enhance the overall composition. 3. Ensure the full range of values from pure white paper to deep darks is present. 4. Maintain the characteristic transparency, luminosity, and flowing quality of watercolor. 5. The finished painting should capture the spontaneous, fresh quality that makes watercolor unique. 6. Preserve the white of the paper for highlights - this is what gives watercolor its luminous quality.";

/// Returns the default instruction for a stage.
#[must_use]
pub const fn default_prompt(kind: StageKind) -> &'static str {
    match kind {
        StageKind::Sketch => SKETCH,
        StageKind::Wash1 => WASH_1,
        StageKind::Wash2 => WASH_2,
        StageKind::MediumTone => MEDIUM_TONE,
        StageKind::Shadow => SHADOW,
        StageKind::Detail => DETAIL,
        StageKind::DarkestValue => DARKEST_VALUE,
        StageKind::Finish => FINISH,
    }
}

/// Joins the system instruction and a stage instruction.
///
/// The two are separated by a blank line. Both are kept verbatim, so an
/// empty system instruction still leaves the separator in front.
#[must_use]
pub fn effective_prompt(system_prompt: &str, stage_prompt: &str) -> String {
    format!("{system_prompt}\n\n{stage_prompt}")
}
